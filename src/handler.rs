// HTTP handler bindings for the decision service
//
// Thin wrappers binding Rocket routes to the Bot's methods. Handlers only
// deserialize the request, fetch the managed Bot and serialize the answer.

use rocket::http::Status;
use rocket::response::status::BadRequest;
use rocket::serde::json::Json;
use serde_json::Value;

use capture_seeker::bot::{Bot, MoveRequest};
use capture_seeker::maze::MazeSnapshot;

/// GET / endpoint
/// Returns service metadata
#[get("/")]
pub fn index(bot: &rocket::State<Bot>) -> Json<Value> {
    Json(bot.info())
}

/// POST /start endpoint
#[post("/start", format = "json", data = "<start_req>")]
pub fn start(bot: &rocket::State<Bot>, start_req: Json<MazeSnapshot>) -> Status {
    bot.start(&start_req);

    Status::Ok
}

/// POST /move endpoint
/// Called each tick to compute and return the next move
#[post("/move", format = "json", data = "<move_req>")]
pub async fn get_move(
    bot: &rocket::State<Bot>,
    move_req: Json<MoveRequest>,
) -> Result<Json<Value>, BadRequest<String>> {
    bot.get_move(&move_req).await.map(Json).map_err(BadRequest)
}

/// POST /end endpoint
/// Drops per-game controllers
#[post("/end", format = "json", data = "<end_req>")]
pub fn end(bot: &rocket::State<Bot>, end_req: Json<MazeSnapshot>) -> Status {
    bot.end(&end_req);

    Status::Ok
}
