//! Translation of pipeline outcomes into boundary responses.
//!
//! A response with `code == 0` is a success. Any other code is the wire
//! code of the [`ErrorKind`](crate::errors::ErrorKind) that stopped the
//! pipeline, and `log` holds the rendered error: full detail in debug
//! mode, redacted otherwise.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::handler::{CheckResult, DeliverResult, Tag};
use crate::errors::Error;

/// Response to a pre-commit check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCheckTx {
    pub code: u32,
    pub data: Vec<u8>,
    pub log: String,
    pub gas_wanted: i64,
    /// Pool priority derived from the paid fee.
    pub gas_used: i64,
}

/// Response to a delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDeliverTx {
    pub code: u32,
    pub data: Vec<u8>,
    pub log: String,
    pub gas_used: i64,
    pub tags: Vec<Tag>,
}

impl ResponseCheckTx {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

impl ResponseDeliverTx {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

impl From<CheckResult> for ResponseCheckTx {
    fn from(res: CheckResult) -> Self {
        Self {
            code: 0,
            data: res.data,
            log: res.log,
            gas_wanted: res.gas_allocated,
            gas_used: res.gas_payment,
        }
    }
}

impl From<DeliverResult> for ResponseDeliverTx {
    fn from(res: DeliverResult) -> Self {
        Self {
            code: 0,
            data: res.data,
            log: res.log,
            gas_used: res.gas_used,
            tags: res.tags,
        }
    }
}

fn render(err: &Error, debug_mode: bool) -> String {
    if debug_mode {
        err.detailed()
    } else {
        err.redacted()
    }
}

/// Failed check response for `err`.
pub fn check_tx_error(err: Error, debug_mode: bool) -> ResponseCheckTx {
    let err = err.wrap("cannot check tx");
    debug!(code = err.code(), error = %err.detailed(), "check rejected");
    ResponseCheckTx {
        code: err.code(),
        log: render(&err, debug_mode),
        ..Default::default()
    }
}

/// Failed deliver response for `err`.
pub fn deliver_tx_error(err: Error, debug_mode: bool) -> ResponseDeliverTx {
    let err = err.wrap("cannot deliver tx");
    warn!(code = err.code(), error = %err.detailed(), "deliver failed");
    ResponseDeliverTx {
        code: err.code(),
        log: render(&err, debug_mode),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn success_maps_fields() {
        let res = ResponseCheckTx::from(CheckResult {
            data: b"ok".to_vec(),
            log: "fine".into(),
            gas_allocated: 50,
            gas_payment: 7,
            ..Default::default()
        });
        assert!(res.is_ok());
        assert_eq!(res.gas_wanted, 50);
        assert_eq!(res.gas_used, 7);

        let res = ResponseDeliverTx::from(DeliverResult {
            gas_used: 3,
            tags: vec![Tag::new("6b", "s")],
            ..Default::default()
        });
        assert!(res.is_ok());
        assert_eq!(res.tags.len(), 1);
    }

    #[test]
    fn errors_carry_stable_code() {
        let res = check_tx_error(Error::new(ErrorKind::InsufficientAmount, "fees 0 IOV"), false);
        assert_eq!(res.code, ErrorKind::InsufficientAmount.code());
        assert_eq!(res.log, "cannot check tx: insufficient amount: fees 0 IOV");
        assert!(!res.is_ok());
    }

    #[test]
    fn debug_mode_includes_call_site() {
        let err = Error::unauthorized("fee payer signature missing");
        let quiet = deliver_tx_error(err.clone(), false);
        let loud = deliver_tx_error(err, true);
        assert!(!quiet.log.contains(file!()));
        assert!(loud.log.contains(file!()));
        assert!(loud.log.starts_with("cannot deliver tx: unauthorized"));
    }

    #[test]
    fn internal_detail_is_redacted() {
        let res = deliver_tx_error(Error::internal("panic: index out of bounds"), false);
        assert_eq!(res.code, ErrorKind::Internal.code());
        assert_eq!(res.log, "cannot deliver tx: internal error");
    }

    #[test]
    fn responses_serialize_for_clients() {
        let res = check_tx_error(Error::new(ErrorKind::InvalidSequence, "expected 1 got 0"), false);
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["code"], ErrorKind::InvalidSequence.code());
        assert_eq!(json["log"], "cannot check tx: invalid sequence: expected 1 got 0");

        let back: ResponseCheckTx = serde_json::from_value(json).unwrap();
        assert_eq!(back, res);
    }
}
