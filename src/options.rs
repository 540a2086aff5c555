use crate::error::NodeError;
use crate::host::HttpRequester;
use crate::request::HttpCallSpec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Page size used by every selection dropdown.
const PAGE_SIZE: u32 = 10;

/// One entry of a selection dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ListOption {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Listing endpoints answer either with a bare array or with an object
/// wrapping the array under `data`. Anything else is an empty listing.
pub fn unwrap_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// First non-empty string among the given keys.
fn first_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .filter_map(|v| v.as_str())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn load_error(entity: &str, err: NodeError) -> NodeError {
    NodeError::ExecutionFailed(format!("could not load {entity}: {err}"))
}

/// Contacts dropdown: `GET /subscribers`, labeled "First Last — detail"
/// where detail is the first of phone, email, id. Records without an
/// identifier are skipped.
#[tracing::instrument(skip(http))]
pub async fn subscriber_options(
    http: &dyn HttpRequester,
    page: u32,
    search: &str,
) -> Result<Vec<ListOption>, NodeError> {
    let mut query = vec![
        ("limit".to_string(), PAGE_SIZE.to_string()),
        ("page".to_string(), page.to_string()),
    ];
    if !search.is_empty() {
        query.push(("name".to_string(), search.to_string()));
    }
    let res = http
        .request(&HttpCallSpec::get("/subscribers").with_query(query))
        .await
        .map_err(|e| load_error("contacts", e))?;

    let mut out = Vec::new();
    for item in unwrap_list(res) {
        let Value::Object(map) = item else { continue };
        let Some(id) = first_string(&map, &["user_ns", "id", "_id"]) else {
            continue;
        };
        let first = first_string(&map, &["first_name", "firstName"]).unwrap_or_default();
        let last = first_string(&map, &["last_name", "lastName"]).unwrap_or_default();
        let name = format!("{first} {last}").trim().to_string();
        let detail = first_string(&map, &["phone"])
            .or_else(|| first_string(&map, &["email"]))
            .unwrap_or_else(|| id.clone());
        let label = [name, detail]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" — ");
        out.push(ListOption {
            label: if label.is_empty() { id.clone() } else { label },
            value: id.clone(),
            description: Some(format!("NS: {id}")),
        });
    }
    Ok(out)
}

/// Tags dropdown: `GET /flow/tags`; a tag is identified by its name.
#[tracing::instrument(skip(http))]
pub async fn tag_options(
    http: &dyn HttpRequester,
    page: u32,
    search: &str,
) -> Result<Vec<ListOption>, NodeError> {
    let mut query = vec![
        ("per_page".to_string(), PAGE_SIZE.to_string()),
        ("page".to_string(), page.to_string()),
    ];
    if !search.is_empty() {
        query.push(("name".to_string(), search.to_string()));
    }
    let res = http
        .request(&HttpCallSpec::get("/flow/tags").with_query(query))
        .await
        .map_err(|e| load_error("tags", e))?;

    let mut out = Vec::new();
    for item in unwrap_list(res) {
        let Value::Object(map) = item else { continue };
        if let Some(name) = first_string(&map, &["name", "tag_name"]) {
            out.push(ListOption {
                label: name.clone(),
                value: name,
                description: None,
            });
        }
    }
    Ok(out)
}

/// Flows dropdown: `GET /flow/subflows`.
#[tracing::instrument(skip(http))]
pub async fn flow_options(
    http: &dyn HttpRequester,
    page: u32,
    search: &str,
) -> Result<Vec<ListOption>, NodeError> {
    let mut query = vec![
        ("per_page".to_string(), PAGE_SIZE.to_string()),
        ("page".to_string(), page.to_string()),
    ];
    if !search.is_empty() {
        query.push(("search".to_string(), search.to_string()));
    }
    let res = http
        .request(&HttpCallSpec::get("/flow/subflows").with_query(query))
        .await
        .map_err(|e| load_error("flows", e))?;

    let mut out = Vec::new();
    for item in unwrap_list(res) {
        let Value::Object(map) = item else { continue };
        let Some(id) = first_string(&map, &["sub_flow_ns", "flow_id", "id", "_id"]) else {
            continue;
        };
        let label = first_string(&map, &["name", "flow_name"]).unwrap_or_else(|| id.clone());
        let ns = first_string(&map, &["sub_flow_ns"]).unwrap_or_else(|| id.clone());
        out.push(ListOption {
            label,
            value: id,
            description: Some(format!("NS: {ns}")),
        });
    }
    Ok(out)
}

/// Custom-field dropdown: `GET /flow/user-fields`, no paging on this
/// endpoint. Entries need both a name and a `var_ns`.
#[tracing::instrument(skip(http))]
pub async fn custom_field_options(
    http: &dyn HttpRequester,
) -> Result<Vec<ListOption>, NodeError> {
    let res = http
        .request(&HttpCallSpec::get("/flow/user-fields"))
        .await
        .map_err(|e| load_error("custom fields", e))?;

    let mut out = Vec::new();
    for item in unwrap_list(res) {
        let Value::Object(map) = item else { continue };
        let name = first_string(&map, &["name", "field_name"]);
        let id = first_string(&map, &["var_ns", "id", "_id"]);
        if let (Some(name), Some(id)) = (name, id) {
            out.push(ListOption {
                label: name,
                value: id,
                description: None,
            });
        }
    }
    Ok(out)
}

/// WhatsApp templates dropdown: the listing is a POST with the paging in
/// the body. Labels carry the template language, defaulting to `pt_BR`.
#[tracing::instrument(skip(http))]
pub async fn template_options(
    http: &dyn HttpRequester,
    page: u32,
    search: &str,
) -> Result<Vec<ListOption>, NodeError> {
    let body = json!({"page": page, "per_page": PAGE_SIZE, "search": search});
    let res = http
        .request(&HttpCallSpec::post("/whatsapp-template/list", body))
        .await
        .map_err(|e| load_error("templates", e))?;

    let mut out = Vec::new();
    for item in unwrap_list(res) {
        let Value::Object(map) = item else { continue };
        if let Some(name) = first_string(&map, &["name"]) {
            let lang =
                first_string(&map, &["language"]).unwrap_or_else(|| "pt_BR".to_string());
            out.push(ListOption {
                label: format!("{name} ({lang})"),
                value: name,
                description: None,
            });
        }
    }
    Ok(out)
}
