//! Newline-delimited JSON arithmetic protocol used as a load target.
//!
//! A request carries two operands and an operator; the server answers with
//! the result and a printable formula:
//!
//! ```text
//! -> {"id":7,"operands":[12,3],"operator":"/"}
//! <- {"id":7,"formula":"12 / 3 = 4","result":4,"err":null}
//! ```

pub mod comm;
pub mod server;

use serde::{Deserialize, Serialize};

pub use comm::TcpComm;
pub use server::TcpServer;

/// Frame delimiter on the wire.
pub const DELIM: u8 = b'\n';

/// Operators the server understands.
pub const OPERATORS: [&str; 4] = ["+", "-", "*", "/"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerReq {
    pub id: i64,
    pub operands: Vec<i64>,
    pub operator: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerResp {
    pub id: i64,
    #[serde(default)]
    pub formula: String,
    #[serde(default)]
    pub result: i64,
    #[serde(default)]
    pub err: Option<String>,
}

/// Fold `operands` left to right with `operator`.
///
/// Returns None for an unknown operator, an empty operand list, overflow,
/// or division by zero.
pub fn evaluate(operands: &[i64], operator: &str) -> Option<i64> {
    let (first, rest) = operands.split_first()?;
    rest.iter().try_fold(*first, |acc, &v| match operator {
        "+" => acc.checked_add(v),
        "-" => acc.checked_sub(v),
        "*" => acc.checked_mul(v),
        "/" => acc.checked_div(v),
        _ => None,
    })
}

/// Render `12 / 3 = 4` (or `!=` when `equal` is false).
pub fn formula(operands: &[i64], operator: &str, result: i64, equal: bool) -> String {
    let lhs = operands
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(&format!(" {operator} "));
    let sign = if equal { "=" } else { "!=" };
    format!("{lhs} {sign} {result}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate() {
        assert_eq!(evaluate(&[12, 3], "+"), Some(15));
        assert_eq!(evaluate(&[12, 3], "-"), Some(9));
        assert_eq!(evaluate(&[12, 3], "*"), Some(36));
        assert_eq!(evaluate(&[12, 3], "/"), Some(4));
        assert_eq!(evaluate(&[100, 5, 2], "/"), Some(10));
        assert_eq!(evaluate(&[7], "*"), Some(7));
    }

    #[test]
    fn test_evaluate_rejects_bad_input() {
        assert_eq!(evaluate(&[], "+"), None);
        assert_eq!(evaluate(&[1, 0], "/"), None);
        assert_eq!(evaluate(&[1, 2], "%"), None);
        assert_eq!(evaluate(&[i64::MAX, 1], "+"), None);
    }

    #[test]
    fn test_formula() {
        assert_eq!(formula(&[12, 3], "/", 4, true), "12 / 3 = 4");
        assert_eq!(formula(&[1, 2, 3], "+", 7, false), "1 + 2 + 3 != 7");
    }

    #[test]
    fn test_resp_tolerates_missing_fields() {
        let resp: ServerResp = serde_json::from_str(r#"{"id": 3, "err": "bad"}"#).unwrap();
        assert_eq!(resp.id, 3);
        assert_eq!(resp.result, 0);
        assert_eq!(resp.err.as_deref(), Some("bad"));
    }
}
