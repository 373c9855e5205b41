mod common;
mod documents;
mod status_router;
