use serde_json::json;

use crate::allocate::AllocateError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Store failure outside the allocation flow; logged like `allocate_err`.
pub fn store_err(
    id: &str,
    code: &str,
    e: &rusqlite::Error,
    table: Option<&str>,
) -> serde_json::Value {
    tracing::error!(code, table, error = %e, "store operation failed");
    err(id, code, e.to_string(), table.map(|t| json!({ "table": t })))
}

pub fn allocate_err(id: &str, e: &AllocateError) -> serde_json::Value {
    let details = e.table().map(|t| json!({ "table": t }));
    if details.is_some() {
        tracing::error!(code = e.code(), error = %e, "store operation failed");
    }
    err(id, e.code(), e.to_string(), details)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_err_carries_code_message_and_table() {
        let e = rusqlite::Error::QueryReturnedNoRows;
        let v = store_err("7", "db_insert_failed", &e, Some("computers"));
        assert_eq!(v["id"], "7");
        assert_eq!(v["ok"], false);
        assert_eq!(v["error"]["code"], "db_insert_failed");
        assert_eq!(v["error"]["message"], e.to_string());
        assert_eq!(v["error"]["details"]["table"], "computers");

        let v = store_err("8", "db_query_failed", &e, None);
        assert!(v["error"].get("details").is_none());
    }

    #[test]
    fn allocate_err_maps_validation_without_details() {
        let v = allocate_err("9", &AllocateError::NoStudents);
        assert_eq!(v["error"]["code"], "bad_params");
        assert!(v["error"].get("details").is_none());
    }
}
