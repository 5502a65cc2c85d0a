use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;
use crate::{categories, health, messages, posts, status, users};

/// All endpoints, nested under `/api`. Transport layers (CORS, tracing) are
/// added by the binary.
pub fn router(state: AppState) -> Router {
    let board = Router::new()
        .route("/messages", get(messages::get_messages).post(messages::create_message))
        .route(
            "/messages/{id}",
            put(messages::update_message).delete(messages::delete_message),
        )
        .route("/status/{code}", get(status::get_status))
        .route("/cat/{code}", get(status::get_cat_image))
        .route("/health", get(health::health));

    let blog = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route("/users/{id}/posts", get(users::list_user_posts))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{id}",
            get(posts::get_post).put(posts::update_post).delete(posts::delete_post),
        )
        .route("/posts/{id}/categories", get(posts::list_post_categories))
        .route(
            "/posts/{id}/categories/{category_id}",
            put(posts::attach_category).delete(posts::detach_category),
        )
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/categories/{id}/posts", get(categories::list_category_posts));

    Router::new()
        .nest("/api", board.merge(blog))
        .with_state(state)
}
