use crate::cli::CardAction;
use crate::context::CliContext;
use crate::output;
use kanban_domain::{BulkReorderRequest, ContainerKind, MoveRequest};

pub async fn handle(ctx: &mut CliContext, action: CardAction) -> anyhow::Result<()> {
    match action {
        CardAction::Create {
            list_id,
            title,
            due,
            priority,
        } => {
            let card = ctx.store().create_card(list_id, title, due, priority)?;
            ctx.save().await?;
            output::output_success(&card)
        }
        CardAction::Move { id, index, list_id } => {
            let request = MoveRequest {
                item_id: id,
                container_id: list_id,
                target_index: index,
            }
            .validate(ContainerKind::Cards)?;
            let outcome = ctx.engine().submit(request).await?;
            ctx.save().await?;
            output::output_success(&outcome)
        }
        CardAction::Reorder { list_id, ids } => {
            let request = BulkReorderRequest {
                container_id: list_id,
                ordered_item_ids: ids,
            }
            .validate(ContainerKind::Cards)?;
            let outcome = ctx.engine().bulk_reorder(&request).await?;
            ctx.save().await?;
            output::output_success(&outcome)
        }
        CardAction::Delete { id } => {
            ctx.store().delete_card(id)?;
            ctx.save().await?;
            output::output_success(serde_json::json!({ "deleted": id.to_string() }))
        }
    }
}
