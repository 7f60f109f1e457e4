pub mod batch;
pub mod dom;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod options;
pub mod registry;
pub mod routes;
pub mod source;
pub mod table_detect;
pub mod table_parse;
pub mod warning;

use worker::{Context, Env, Request, Response, Result, event};

#[event(fetch)]
async fn fetch(req: Request, env: Env, ctx: Context) -> Result<Response> {
    routes::handle(req, env, ctx).await
}
