use crate::cli::ListAction;
use crate::context::CliContext;
use crate::output;
use kanban_domain::{BulkReorderRequest, ContainerKind, MoveRequest};

pub async fn handle(ctx: &mut CliContext, action: ListAction) -> anyhow::Result<()> {
    match action {
        ListAction::Create { board_id, title } => {
            let list = ctx.store().create_list(board_id, title)?;
            ctx.save().await?;
            output::output_success(&list)
        }
        ListAction::Move {
            id,
            index,
            board_id,
        } => {
            let request = MoveRequest {
                item_id: id,
                container_id: board_id,
                target_index: index,
            }
            .validate(ContainerKind::Lists)?;
            let outcome = ctx.engine().submit(request).await?;
            ctx.save().await?;
            output::output_success(&outcome)
        }
        ListAction::Reorder { board_id, ids } => {
            let request = BulkReorderRequest {
                container_id: board_id,
                ordered_item_ids: ids,
            }
            .validate(ContainerKind::Lists)?;
            let outcome = ctx.engine().bulk_reorder(&request).await?;
            ctx.save().await?;
            output::output_success(&outcome)
        }
        ListAction::Delete { id } => {
            ctx.store().delete_list(id)?;
            ctx.save().await?;
            output::output_success(serde_json::json!({ "deleted": id.to_string() }))
        }
    }
}
