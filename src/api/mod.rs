use axum::{
    Router,
    routing::{get, post, put},
};

pub mod api_error;
pub mod auth_extractor;
mod books;
pub mod cookies;
pub mod extract;
pub mod middleware;
mod reviews;
mod user;

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/v1/users", user_routes())
        .nest("/v1/book", book_routes())
        .nest("/v2/feedback", feedback_routes())
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(user::register))
        .route("/login", post(user::login))
        .route("/logout", post(user::logout))
        .route("/refresh-token", post(user::refresh_token))
        .route("/current-user", get(user::current_user))
        .route("/changePassword", post(user::change_password))
        .route("/updateUserdetail", put(user::update_account))
}

fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/addBook", post(books::add_book))
        .route("/getBooks", get(books::list_books))
        .route("/getBook/{id}", get(books::get_book))
        .route("/featuredBooks", get(books::featured_books))
}

fn feedback_routes() -> Router<AppState> {
    Router::new()
        .route("/review", post(reviews::submit_review))
        .route("/average", post(reviews::average_rating))
        .route("/getReview/{id}", get(reviews::get_reviews))
}
