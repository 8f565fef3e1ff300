use kanban_domain::{Board, Card, List};
use serde::Serialize;

#[derive(Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    pub api_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T: Serialize> {
    pub items: Vec<T>,
    pub count: usize,
}

/// A board with its lists and their cards, each in key order.
#[derive(Serialize)]
pub struct BoardView {
    #[serde(flatten)]
    pub board: Board,
    pub lists: Vec<ListView>,
}

#[derive(Serialize)]
pub struct ListView {
    #[serde(flatten)]
    pub list: List,
    pub cards: Vec<Card>,
}

pub fn output_success<T: Serialize>(data: T) -> anyhow::Result<()> {
    let response = CliResponse {
        success: true,
        api_version: env!("CARGO_PKG_VERSION"),
        data: Some(data),
        error: None,
    };
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

pub fn output_list<T: Serialize>(items: Vec<T>) -> anyhow::Result<()> {
    let count = items.len();
    output_success(ListResponse { items, count })
}

/// Print an error response to stderr and exit with status 1.
pub fn output_error(message: &str) -> ! {
    let response: CliResponse<()> = CliResponse {
        success: false,
        api_version: env!("CARGO_PKG_VERSION"),
        data: None,
        error: Some(message.to_string()),
    };
    match serde_json::to_string(&response) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}", message),
    }
    std::process::exit(1);
}
