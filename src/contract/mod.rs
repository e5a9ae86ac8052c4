//! Contract proxy: the closed method table of the rental contract.
//!
//! Encodes a method name plus typed arguments into an unsigned envelope and
//! decodes result payloads back into typed values or contract errors. The
//! wire encoding is fixed by the remote contract's interface descriptor;
//! validation here is advisory — the contract is authoritative — but
//! obviously malformed calls are rejected before paying any network cost.

mod error;
mod types;

pub use error::ContractError;
pub use types::{CarStatus, ReturnShape, ReturnValue};

use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Default fee hint attached to built envelopes, in stroops.
pub const BASE_FEE: u32 = 100;
/// Default ledger timeout hint, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u32 = 30;

/// The closed set of methods exposed by the rental contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    SetAdminCommission,
    GetAdminCommission,
    AddCar,
    GetCarStatus,
    Rental,
    ReturnCar,
    RemoveCar,
    PayoutOwner,
    PayoutAdmin,
    GetAdminBalance,
}

/// Semantic type of a single contract argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// A ledger account address.
    Address,
    /// A non-negative 128-bit amount.
    Amount,
    /// A strictly positive day count.
    Days,
}

/// One required argument in a method's fixed schema.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ParamType,
}

const fn param(name: &'static str, ty: ParamType) -> ParamSpec {
    ParamSpec { name, ty }
}

impl Method {
    pub const ALL: [Method; 10] = [
        Method::SetAdminCommission,
        Method::GetAdminCommission,
        Method::AddCar,
        Method::GetCarStatus,
        Method::Rental,
        Method::ReturnCar,
        Method::RemoveCar,
        Method::PayoutOwner,
        Method::PayoutAdmin,
        Method::GetAdminBalance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Method::SetAdminCommission => "set_admin_commission",
            Method::GetAdminCommission => "get_admin_commission",
            Method::AddCar => "add_car",
            Method::GetCarStatus => "get_car_status",
            Method::Rental => "rental",
            Method::ReturnCar => "return_car",
            Method::RemoveCar => "remove_car",
            Method::PayoutOwner => "payout_owner",
            Method::PayoutAdmin => "payout_admin",
            Method::GetAdminBalance => "get_admin_balance",
        }
    }

    pub fn from_name(name: &str) -> Option<Method> {
        Method::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Fixed argument schema, derived from the contract interface descriptor.
    pub fn params(&self) -> &'static [ParamSpec] {
        match self {
            Method::SetAdminCommission => &const { [param("commission", ParamType::Amount)] },
            Method::GetAdminCommission => &[],
            Method::AddCar => &const {
                [
                    param("owner", ParamType::Address),
                    param("price_per_day", ParamType::Amount),
                ]
            },
            Method::GetCarStatus => &const { [param("owner", ParamType::Address)] },
            Method::Rental => &const {
                [
                    param("renter", ParamType::Address),
                    param("owner", ParamType::Address),
                    param("total_days_to_rent", ParamType::Days),
                ]
            },
            Method::ReturnCar => &const {
                [
                    param("renter", ParamType::Address),
                    param("owner", ParamType::Address),
                ]
            },
            Method::RemoveCar => &const { [param("owner", ParamType::Address)] },
            Method::PayoutOwner => &const {
                [
                    param("owner", ParamType::Address),
                    param("amount", ParamType::Amount),
                ]
            },
            Method::PayoutAdmin => &const { [param("amount", ParamType::Amount)] },
            Method::GetAdminBalance => &[],
        }
    }

    pub fn return_shape(&self) -> ReturnShape {
        match self {
            Method::GetAdminCommission | Method::GetAdminBalance => ReturnShape::Amount,
            Method::GetCarStatus => ReturnShape::CarStatus,
            _ => ReturnShape::Void,
        }
    }

    /// Read-only queries are open to any connected session.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Method::GetAdminCommission | Method::GetCarStatus | Method::GetAdminBalance
        )
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An unsigned, fully described contract invocation. One-shot: the
/// pipeline consumes it and it is never reused.
#[derive(Debug, Clone)]
pub struct PendingCall {
    pub method: Method,
    pub args: Map<String, Value>,
    /// Serialized envelope, opaque to everything past this module.
    pub envelope: String,
    pub fee_hint: u32,
    pub timeout_hint_secs: u32,
}

#[derive(Serialize)]
struct EnvelopeBody<'a> {
    contract_id: &'a str,
    method: &'static str,
    args: &'a Map<String, Value>,
    source: &'a str,
    fee: u32,
    timeout_secs: u32,
}

/// Builds unsigned envelopes against one deployed contract.
#[derive(Debug, Clone)]
pub struct ContractProxy {
    contract_id: String,
}

impl ContractProxy {
    pub fn new(contract_id: impl Into<String>) -> Self {
        Self {
            contract_id: contract_id.into(),
        }
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    /// Validate `args` against the method schema and build a `PendingCall`.
    pub fn build(
        &self,
        method: Method,
        args: Map<String, Value>,
        source: &str,
    ) -> Result<PendingCall> {
        if self.contract_id.is_empty() {
            return Err(Error::Config("contract id is not configured".to_string()));
        }

        let specs = method.params();
        for spec in specs {
            let value = args.get(spec.name).ok_or_else(|| {
                Error::SchemaMismatch(format!("{}: missing argument `{}`", method, spec.name))
            })?;
            validate_param(method, spec, value)?;
        }
        for name in args.keys() {
            if !specs.iter().any(|spec| spec.name == name) {
                return Err(Error::SchemaMismatch(format!(
                    "{}: unexpected argument `{}`",
                    method, name
                )));
            }
        }

        let body = EnvelopeBody {
            contract_id: &self.contract_id,
            method: method.name(),
            args: &args,
            source,
            fee: BASE_FEE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        };
        let envelope = serde_json::to_string(&body)?;

        Ok(PendingCall {
            method,
            args,
            envelope,
            fee_hint: BASE_FEE,
            timeout_hint_secs: DEFAULT_TIMEOUT_SECS,
        })
    }
}

fn validate_param(method: Method, spec: &ParamSpec, value: &Value) -> Result<()> {
    match spec.ty {
        ParamType::Address => match value.as_str() {
            Some(s) if !s.is_empty() => Ok(()),
            _ => Err(Error::SchemaMismatch(format!(
                "{}: `{}` must be a non-empty address",
                method, spec.name
            ))),
        },
        ParamType::Amount => {
            // Amounts within i64 travel as numbers; larger i128 values as
            // decimal strings.
            let parsed = match value {
                Value::Number(n) => n.as_i64().map(i128::from),
                Value::String(s) => s.parse::<i128>().ok(),
                _ => None,
            };
            match parsed {
                Some(v) if v >= 0 => Ok(()),
                _ => Err(Error::SchemaMismatch(format!(
                    "{}: `{}` must be a non-negative integer amount",
                    method, spec.name
                ))),
            }
        }
        ParamType::Days => match value.as_u64() {
            Some(v) if v > 0 && v <= u32::MAX as u64 => Ok(()),
            _ => Err(Error::SchemaMismatch(format!(
                "{}: `{}` must be a positive day count",
                method, spec.name
            ))),
        },
    }
}

/// Decode a result payload for `method`.
///
/// The payload is a tagged object: `{"status":"ok","value":...}` on
/// success, `{"status":"err","code":N}` for a typed contract error. The
/// tag is the leading discriminant; the numeric code goes through the
/// closed `ContractError` table and anything unmapped surfaces as
/// `UnknownContractError` instead of crashing the pipeline.
pub fn decode(payload: &Value, method: Method) -> Result<ReturnValue> {
    let status = payload
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Decode(format!("{}: payload has no status tag", method)))?;

    match status {
        "ok" => decode_value(payload.get("value"), method),
        "err" => {
            let code = payload
                .get("code")
                .and_then(Value::as_u64)
                .ok_or_else(|| Error::Decode(format!("{}: error payload has no code", method)))?;
            let code = u32::try_from(code)
                .map_err(|_| Error::Decode(format!("{}: error code out of range", method)))?;
            match ContractError::from_code(code) {
                Some(error) => Err(Error::Contract(error)),
                None => Err(Error::UnknownContractError(code)),
            }
        }
        other => Err(Error::Decode(format!(
            "{}: unrecognized status tag `{}`",
            method, other
        ))),
    }
}

fn decode_value(value: Option<&Value>, method: Method) -> Result<ReturnValue> {
    match method.return_shape() {
        ReturnShape::Void => Ok(ReturnValue::Void),
        ReturnShape::Amount => {
            let value =
                value.ok_or_else(|| Error::Decode(format!("{}: missing amount value", method)))?;
            let amount = match value {
                Value::Number(n) => n.as_i64().map(i128::from),
                // Amounts past i64 range travel as decimal strings.
                Value::String(s) => s.parse::<i128>().ok(),
                _ => None,
            };
            amount
                .map(ReturnValue::Amount)
                .ok_or_else(|| Error::Decode(format!("{}: value is not an amount", method)))
        }
        ReturnShape::CarStatus => {
            let value =
                value.ok_or_else(|| Error::Decode(format!("{}: missing status value", method)))?;
            let status: CarStatus = serde_json::from_value(value.clone())
                .map_err(|_| Error::Decode(format!("{}: value is not a car status", method)))?;
            Ok(ReturnValue::CarStatus(status))
        }
    }
}
