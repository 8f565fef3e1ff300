use crate::cli::BoardAction;
use crate::context::CliContext;
use crate::output::{self, BoardView, ListView};
use uuid::Uuid;

pub async fn handle(ctx: &mut CliContext, action: BoardAction) -> anyhow::Result<()> {
    match action {
        BoardAction::Create {
            title,
            organization_id,
        } => {
            let organization_id = organization_id.unwrap_or_else(Uuid::new_v4);
            let board = ctx.store().create_board(organization_id, title);
            ctx.save().await?;
            output::output_success(&board)
        }
        BoardAction::Show { id } => {
            let store = ctx.store();
            let Some(board) = store.board(id) else {
                output::output_error(&format!("Board not found: {}", id));
            };
            let lists = store
                .lists_on_board(id)
                .into_iter()
                .map(|list| ListView {
                    cards: store.cards_in_list(list.id),
                    list,
                })
                .collect();
            output::output_success(BoardView { board, lists })
        }
        BoardAction::Delete { id } => {
            ctx.store().delete_board(id)?;
            ctx.save().await?;
            output::output_success(serde_json::json!({ "deleted": id.to_string() }))
        }
    }
}
