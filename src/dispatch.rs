use crate::error::NodeError;
use crate::host::RowParams;
use crate::request::{HttpCallSpec, insert_if_set, sparse_query};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strum_macros::{Display, EnumIter, EnumString};

/// Entity kinds the node exposes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Resource {
    Subscriber,
    Tag,
    CustomField,
    Flow,
    Broadcast,
    WhatsappTemplate,
    Conversation,
}

/// Operations across all resources; which ones a resource supports is
/// decided by [`handler`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Operation {
    Create,
    Get,
    Search,
    Update,
    Delete,
    GetMany,
    AddToSubscriber,
    AddMultipleTags,
    RemoveFromSubscriber,
    RemoveMultipleTags,
    SetFieldValue,
    SetMultipleFields,
    SendToSubscriber,
    Send,
    SendByTag,
    GetHistory,
}

/// The API rejects batches above this size on the multi-entry endpoints.
pub const MAX_BATCH_ENTRIES: usize = 20;

/// Filter fields accepted by the contact search endpoint.
const SEARCH_FILTERS: &[&str] = &[
    "limit",
    "page",
    "name",
    "phone",
    "email",
    "is_channel",
    "is_opt_in_email",
    "is_opt_in_sms",
    "is_interacted_in_last_24h",
    "is_bot_interacted_in_last_24h",
    "is_last_message_in_last_24h",
    "tag_ns",
    "label_id",
    "event_ns",
    "user_field_ns",
    "user_field_value",
];

pub type BuildFn = fn(&RowParams) -> Result<HttpCallSpec, NodeError>;

/// One entry of the (resource, operation) lookup table: the parameters a
/// row must carry and the function shaping the outbound call.
#[derive(Clone, Copy)]
pub struct Handler {
    pub required: &'static [&'static str],
    pub build: BuildFn,
}

/// Resolve the handler for a (resource, operation) pair. `None` means the
/// combination does not exist and the run must not start.
pub fn handler(resource: Resource, operation: Operation) -> Option<Handler> {
    use Operation::*;
    use Resource::*;

    let handler = match (resource, operation) {
        (Subscriber, Create) => Handler {
            required: &[],
            build: subscriber_create,
        },
        (Subscriber, Get) => Handler {
            required: &["user_ns"],
            build: subscriber_get,
        },
        (Subscriber, Search) => Handler {
            required: &[],
            build: subscriber_search,
        },
        (Subscriber, Update) => Handler {
            required: &["user_ns"],
            build: subscriber_update,
        },
        (Subscriber, Delete) => Handler {
            required: &["user_ns"],
            build: subscriber_delete,
        },
        (Tag, AddToSubscriber) => Handler {
            required: &["user_ns", "tag_name"],
            build: tag_add,
        },
        (Tag, AddMultipleTags) => Handler {
            required: &["user_ns", "tag_names"],
            build: tag_add_multiple,
        },
        (Tag, RemoveFromSubscriber) => Handler {
            required: &["user_ns", "tag_name"],
            build: tag_remove,
        },
        (Tag, RemoveMultipleTags) => Handler {
            required: &["user_ns", "tag_names"],
            build: tag_remove_multiple,
        },
        (Tag, Create) => Handler {
            required: &["name"],
            build: tag_create,
        },
        (Tag, Delete) => Handler {
            required: &["name"],
            build: tag_delete,
        },
        (Tag, GetMany) => Handler {
            required: &[],
            build: tag_get_many,
        },
        (CustomField, GetMany) => Handler {
            required: &[],
            build: custom_field_get_many,
        },
        (CustomField, SetFieldValue) => Handler {
            required: &["user_ns", "var_ns", "value"],
            build: custom_field_set,
        },
        (CustomField, SetMultipleFields) => Handler {
            required: &["user_ns", "fields"],
            build: custom_field_set_multiple,
        },
        (Flow, SendToSubscriber) => Handler {
            required: &["user_ns", "flow_id"],
            build: flow_send,
        },
        (Flow, GetMany) => Handler {
            required: &[],
            build: flow_get_many,
        },
        (Broadcast, Send) => Handler {
            required: &["user_ns_list", "content"],
            build: broadcast_send,
        },
        (Broadcast, SendByTag) => Handler {
            required: &["tag_name", "content"],
            build: broadcast_send_by_tag,
        },
        (WhatsappTemplate, Send) => Handler {
            required: &["user_ns", "template_name"],
            build: whatsapp_template_send,
        },
        (Conversation, GetHistory) => Handler {
            required: &["user_ns"],
            build: conversation_history,
        },
        _ => return None,
    };
    Some(handler)
}

fn subscriber_create(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    let mut body = Map::new();
    for key in ["first_name", "last_name", "email", "phone"] {
        insert_if_set(&mut body, key, params.value(key));
    }
    Ok(HttpCallSpec::post("/subscriber/create", Value::Object(body)))
}

fn subscriber_get(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    let user_ns = params.string("user_ns")?;
    Ok(HttpCallSpec::get("/subscriber/get-info")
        .with_query(vec![("user_ns".into(), user_ns)]))
}

fn subscriber_search(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    let filters = params.object("filters");
    Ok(HttpCallSpec::get("/subscribers").with_query(sparse_query(&filters, SEARCH_FILTERS)))
}

fn subscriber_update(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    let mut body = Map::new();
    body.insert("user_ns".into(), Value::String(params.string("user_ns")?));
    // partial update: only the fields the caller supplied, values verbatim
    for (key, value) in params.object("update_fields") {
        body.insert(key, value);
    }
    Ok(HttpCallSpec::put("/subscriber/update", Value::Object(body)))
}

fn subscriber_delete(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    let user_ns = params.string("user_ns")?;
    Ok(HttpCallSpec::delete(
        "/subscriber/delete",
        json!({"user_ns": user_ns}),
    ))
}

fn tag_body(params: &RowParams) -> Result<Value, NodeError> {
    Ok(json!({
        "user_ns": params.string("user_ns")?,
        "tag_name": params.string("tag_name")?,
    }))
}

fn tag_add(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    Ok(HttpCallSpec::post(
        "/subscriber/add-tag-by-name",
        tag_body(params)?,
    ))
}

fn tag_remove(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    Ok(HttpCallSpec::delete(
        "/subscriber/remove-tag-by-name",
        tag_body(params)?,
    ))
}

fn tag_batch_body(params: &RowParams) -> Result<Value, NodeError> {
    let names = params.string_array("tag_names");
    ensure_batch_size(names.len(), "tag_names")?;
    let data: Vec<Value> = names.into_iter().map(|n| json!({"tag_name": n})).collect();
    Ok(json!({"user_ns": params.string("user_ns")?, "data": data}))
}

fn tag_add_multiple(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    Ok(HttpCallSpec::post(
        "/subscriber/add-tags-by-name",
        tag_batch_body(params)?,
    ))
}

fn tag_remove_multiple(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    Ok(HttpCallSpec::delete(
        "/subscriber/remove-tags-by-name",
        tag_batch_body(params)?,
    ))
}

fn tag_create(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    Ok(HttpCallSpec::post(
        "/flow/create-tag",
        json!({"name": params.string("name")?}),
    ))
}

fn tag_delete(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    Ok(HttpCallSpec::delete(
        "/flow/delete-tag-by-name",
        json!({"name": params.string("name")?}),
    ))
}

fn tag_get_many(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    let options = params.object("options");
    Ok(HttpCallSpec::get("/flow/tags")
        .with_query(sparse_query(&options, &["limit", "page", "name"])))
}

fn custom_field_get_many(_params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    Ok(HttpCallSpec::get("/flow/user-fields"))
}

fn custom_field_set(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    Ok(HttpCallSpec::put(
        "/subscriber/set-user-field",
        json!({
            "user_ns": params.string("user_ns")?,
            "var_ns": params.string("var_ns")?,
            "value": params.string("value")?,
        }),
    ))
}

fn custom_field_set_multiple(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    let fields = params.object_array("fields");
    ensure_batch_size(fields.len(), "fields")?;
    let mut data = Vec::with_capacity(fields.len());
    for field in fields {
        let var_ns = field
            .get("var_ns")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                NodeError::InvalidInput("every fields entry needs a var_ns".into())
            })?;
        let value = field.get("value").cloned().unwrap_or_else(|| json!(""));
        data.push(json!({"var_ns": var_ns, "value": value}));
    }
    Ok(HttpCallSpec::put(
        "/subscriber/set-user-fields",
        json!({"user_ns": params.string("user_ns")?, "data": data}),
    ))
}

fn flow_send(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    Ok(HttpCallSpec::post(
        "/subscriber/send-sub-flow",
        json!({
            "user_ns": params.string("user_ns")?,
            "flow_id": params.string("flow_id")?,
        }),
    ))
}

fn flow_get_many(_params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    Ok(HttpCallSpec::get("/flow/subflows"))
}

fn broadcast_send(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    let list = params.string("user_ns_list")?;
    // entries are trimmed but empty ones are kept, matching the API contract
    let users: Vec<String> = list.split(',').map(|u| u.trim().to_string()).collect();
    Ok(HttpCallSpec::post(
        "/subscriber/broadcast",
        json!({"user_ns_list": users, "content": params.string("content")?}),
    ))
}

fn broadcast_send_by_tag(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    Ok(HttpCallSpec::post(
        "/subscriber/broadcast-by-tag",
        json!({
            "tag_name": params.string("tag_name")?,
            "content": params.string("content")?,
        }),
    ))
}

fn whatsapp_template_send(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    let mut body = Map::new();
    body.insert("user_ns".into(), Value::String(params.string("user_ns")?));
    body.insert(
        "template_name".into(),
        Value::String(params.string("template_name")?),
    );
    if let Some(raw) = params.opt_string("template_parameters") {
        let parsed: Value = serde_json::from_str(&raw).map_err(|_| {
            NodeError::InvalidInput("template parameters must be valid JSON".into())
        })?;
        body.insert("parameters".into(), parsed);
    }
    Ok(HttpCallSpec::post(
        "/subscriber/send-whatsapp-template",
        Value::Object(body),
    ))
}

fn conversation_history(params: &RowParams) -> Result<HttpCallSpec, NodeError> {
    let user_ns = params.string("user_ns")?;
    let limit = params.u64_or("limit", 50);
    Ok(HttpCallSpec::get("/subscriber/chat-messages").with_query(vec![
        ("user_ns".into(), user_ns),
        ("limit".into(), limit.to_string()),
    ]))
}

fn ensure_batch_size(len: usize, name: &str) -> Result<(), NodeError> {
    if len > MAX_BATCH_ENTRIES {
        return Err(NodeError::InvalidInput(format!(
            "{name} accepts at most {MAX_BATCH_ENTRIES} entries, got {len}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::InputRows;
    use crate::request::HttpMethod;
    use serde_json::json;
    use strum::IntoEnumIterator;

    fn build(resource: Resource, operation: Operation, row: Value) -> HttpCallSpec {
        try_build(resource, operation, row).unwrap()
    }

    fn try_build(
        resource: Resource,
        operation: Operation,
        row: Value,
    ) -> Result<HttpCallSpec, NodeError> {
        let rows = InputRows::new(vec![row.as_object().unwrap().clone()]);
        let params = RowParams::new(&rows, 0);
        let handler = handler(resource, operation).unwrap();
        (handler.build)(&params)
    }

    #[test]
    fn table_covers_exactly_the_documented_pairs() {
        let mut supported = Vec::new();
        for resource in Resource::iter() {
            for operation in Operation::iter() {
                if handler(resource, operation).is_some() {
                    supported.push((resource, operation));
                }
            }
        }
        assert_eq!(supported.len(), 21);
        assert!(handler(Resource::Conversation, Operation::Create).is_none());
        assert!(handler(Resource::Broadcast, Operation::GetMany).is_none());
    }

    #[test]
    fn every_operation_hits_its_endpoint() {
        use HttpMethod::*;
        let full = json!({
            "user_ns": "u1", "tag_name": "vip", "tag_names": ["a"], "name": "t",
            "var_ns": "v1", "value": "x", "fields": [{"var_ns": "v1", "value": "x"}],
            "flow_id": "f1", "user_ns_list": "u1,u2", "content": "hi",
            "template_name": "tpl", "limit": 10,
        });
        let cases = [
            (Resource::Subscriber, Operation::Create, Post, "/subscriber/create"),
            (Resource::Subscriber, Operation::Get, Get, "/subscriber/get-info"),
            (Resource::Subscriber, Operation::Search, Get, "/subscribers"),
            (Resource::Subscriber, Operation::Update, Put, "/subscriber/update"),
            (Resource::Subscriber, Operation::Delete, Delete, "/subscriber/delete"),
            (Resource::Tag, Operation::AddToSubscriber, Post, "/subscriber/add-tag-by-name"),
            (Resource::Tag, Operation::AddMultipleTags, Post, "/subscriber/add-tags-by-name"),
            (Resource::Tag, Operation::RemoveFromSubscriber, Delete, "/subscriber/remove-tag-by-name"),
            (Resource::Tag, Operation::RemoveMultipleTags, Delete, "/subscriber/remove-tags-by-name"),
            (Resource::Tag, Operation::Create, Post, "/flow/create-tag"),
            (Resource::Tag, Operation::Delete, Delete, "/flow/delete-tag-by-name"),
            (Resource::Tag, Operation::GetMany, Get, "/flow/tags"),
            (Resource::CustomField, Operation::GetMany, Get, "/flow/user-fields"),
            (Resource::CustomField, Operation::SetFieldValue, Put, "/subscriber/set-user-field"),
            (Resource::CustomField, Operation::SetMultipleFields, Put, "/subscriber/set-user-fields"),
            (Resource::Flow, Operation::SendToSubscriber, Post, "/subscriber/send-sub-flow"),
            (Resource::Flow, Operation::GetMany, Get, "/flow/subflows"),
            (Resource::Broadcast, Operation::Send, Post, "/subscriber/broadcast"),
            (Resource::Broadcast, Operation::SendByTag, Post, "/subscriber/broadcast-by-tag"),
            (Resource::WhatsappTemplate, Operation::Send, Post, "/subscriber/send-whatsapp-template"),
            (Resource::Conversation, Operation::GetHistory, Get, "/subscriber/chat-messages"),
        ];
        for (resource, operation, method, path) in cases {
            let spec = build(resource, operation, full.clone());
            assert_eq!(spec.method, method, "{resource}.{operation}");
            assert_eq!(spec.path, path, "{resource}.{operation}");
        }
    }

    #[test]
    fn create_body_carries_only_supplied_fields() {
        let spec = build(
            Resource::Subscriber,
            Operation::Create,
            json!({"email": "a@b.com", "first_name": "", "phone": null}),
        );
        assert_eq!(spec.body, Some(json!({"email": "a@b.com"})));
    }

    #[test]
    fn search_omits_empty_filters() {
        let spec = build(
            Resource::Subscriber,
            Operation::Search,
            json!({"filters": {"name": "Ana", "email": "", "label_id": 0, "limit": 50}}),
        );
        assert_eq!(
            spec.query,
            vec![
                ("limit".to_string(), "50".to_string()),
                ("name".to_string(), "Ana".to_string()),
            ]
        );
        // same sparse input, same omissions
        let again = build(
            Resource::Subscriber,
            Operation::Search,
            json!({"filters": {"name": "Ana", "email": "", "label_id": 0, "limit": 50}}),
        );
        assert_eq!(spec, again);
    }

    #[test]
    fn update_merges_partial_fields_over_user_ns() {
        let spec = build(
            Resource::Subscriber,
            Operation::Update,
            json!({"user_ns": "u1", "update_fields": {"first_name": "Ana", "email": "a@b.com"}}),
        );
        assert_eq!(
            spec.body,
            Some(json!({"user_ns": "u1", "first_name": "Ana", "email": "a@b.com"}))
        );
    }

    #[test]
    fn multi_tag_payload_wraps_names() {
        let spec = build(
            Resource::Tag,
            Operation::AddMultipleTags,
            json!({"user_ns": "u1", "tag_names": ["vip", "new"]}),
        );
        assert_eq!(
            spec.body,
            Some(json!({
                "user_ns": "u1",
                "data": [{"tag_name": "vip"}, {"tag_name": "new"}],
            }))
        );
    }

    #[test]
    fn batches_over_twenty_entries_are_rejected() {
        let names: Vec<String> = (0..21).map(|i| format!("tag{i}")).collect();
        let err = try_build(
            Resource::Tag,
            Operation::RemoveMultipleTags,
            json!({"user_ns": "u1", "tag_names": names}),
        )
        .unwrap_err();
        assert!(matches!(err, NodeError::InvalidInput(_)));
    }

    #[test]
    fn broadcast_list_is_split_and_trimmed() {
        let spec = build(
            Resource::Broadcast,
            Operation::Send,
            json!({"user_ns_list": "a, b ,c", "content": "hello"}),
        );
        assert_eq!(
            spec.body,
            Some(json!({"user_ns_list": ["a", "b", "c"], "content": "hello"}))
        );
    }

    #[test]
    fn broadcast_keeps_empty_entries() {
        let spec = build(
            Resource::Broadcast,
            Operation::Send,
            json!({"user_ns_list": "a,,b", "content": "hello"}),
        );
        assert_eq!(
            spec.body,
            Some(json!({"user_ns_list": ["a", "", "b"], "content": "hello"}))
        );
    }

    #[test]
    fn template_parameters_must_be_valid_json() {
        let err = try_build(
            Resource::WhatsappTemplate,
            Operation::Send,
            json!({"user_ns": "u1", "template_name": "tpl", "template_parameters": "{invalid"}),
        )
        .unwrap_err();
        assert_eq!(
            err,
            NodeError::InvalidInput("template parameters must be valid JSON".into())
        );
    }

    #[test]
    fn empty_template_parameters_omit_the_key() {
        let spec = build(
            Resource::WhatsappTemplate,
            Operation::Send,
            json!({"user_ns": "u1", "template_name": "tpl", "template_parameters": ""}),
        );
        assert_eq!(
            spec.body,
            Some(json!({"user_ns": "u1", "template_name": "tpl"}))
        );

        let with_params = build(
            Resource::WhatsappTemplate,
            Operation::Send,
            json!({"user_ns": "u1", "template_name": "tpl", "template_parameters": "[\"x\"]"}),
        );
        assert_eq!(
            with_params.body,
            Some(json!({"user_ns": "u1", "template_name": "tpl", "parameters": ["x"]}))
        );
    }

    #[test]
    fn conversation_history_defaults_the_limit() {
        let spec = build(
            Resource::Conversation,
            Operation::GetHistory,
            json!({"user_ns": "u1"}),
        );
        assert_eq!(
            spec.query,
            vec![
                ("user_ns".to_string(), "u1".to_string()),
                ("limit".to_string(), "50".to_string()),
            ]
        );
    }

    #[test]
    fn set_multiple_fields_requires_var_ns_per_entry() {
        let err = try_build(
            Resource::CustomField,
            Operation::SetMultipleFields,
            json!({"user_ns": "u1", "fields": [{"value": "x"}]}),
        )
        .unwrap_err();
        assert!(matches!(err, NodeError::InvalidInput(_)));

        let spec = build(
            Resource::CustomField,
            Operation::SetMultipleFields,
            json!({"user_ns": "u1", "fields": [{"var_ns": "v1", "value": "x"}]}),
        );
        assert_eq!(
            spec.body,
            Some(json!({"user_ns": "u1", "data": [{"var_ns": "v1", "value": "x"}]}))
        );
    }

    #[test]
    fn resource_and_operation_parse_their_wire_names() {
        assert_eq!(
            "whatsappTemplate".parse::<Resource>().unwrap(),
            Resource::WhatsappTemplate
        );
        assert_eq!(
            "addToSubscriber".parse::<Operation>().unwrap(),
            Operation::AddToSubscriber
        );
        assert_eq!(Operation::GetHistory.to_string(), "getHistory");
        assert!("livechat".parse::<Resource>().is_err());
    }
}
