use crate::dispatch::{Handler, Operation, Resource, handler};
use crate::error::NodeError;
use crate::host::{NodeContext, RowParams};
use serde_json::{Value, json};
use tracing::{debug, warn};

/// The RoiChat operation dispatcher. Stateless: each run reads the selected
/// resource/operation once, then translates every input row into at most one
/// authenticated API call and forwards the payload verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoiChatNode;

impl RoiChatNode {
    pub fn new() -> Self {
        Self
    }

    /// Process all input rows. In tolerant mode a failing row becomes an
    /// `{"error": message}` record and its siblings are untouched; in strict
    /// mode the first failure aborts the batch. Output rows map 1:1 onto
    /// input row indices.
    #[tracing::instrument(name = "roichat_node_execute", skip(self, ctx))]
    pub async fn execute(&self, ctx: &NodeContext) -> Result<Vec<Value>, NodeError> {
        // resource and operation are fixed for the whole batch
        let params = RowParams::new(ctx.params(), 0);
        let resource = parse_selector::<Resource>(&params, "resource")?;
        let operation = parse_selector::<Operation>(&params, "operation")?;
        let handler = handler(resource, operation).ok_or_else(|| {
            NodeError::InvalidInput(format!("{resource} does not support {operation}"))
        })?;
        debug!(%resource, %operation, "dispatching");

        let rows = ctx.params().row_count();
        let mut out = Vec::with_capacity(rows);
        for row in 0..rows {
            match self.run_row(ctx, &handler, row).await {
                Ok(payload) => out.push(payload),
                Err(err) if ctx.continue_on_fail() => {
                    warn!(row, %err, "row failed, continuing");
                    out.push(json!({"error": err.to_string()}));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    async fn run_row(
        &self,
        ctx: &NodeContext,
        handler: &Handler,
        row: usize,
    ) -> Result<Value, NodeError> {
        let params = RowParams::new(ctx.params(), row);
        for name in handler.required {
            if !params.has(name) {
                return Err(NodeError::MissingParameter((*name).to_string()));
            }
        }
        let spec = (handler.build)(&params)?;
        ctx.http().request(&spec).await
    }
}

fn parse_selector<T>(params: &RowParams, name: &str) -> Result<T, NodeError>
where
    T: std::str::FromStr,
{
    let raw = params.string(name)?;
    raw.parse()
        .map_err(|_| NodeError::InvalidInput(format!("unknown {name}: {raw}")))
}
