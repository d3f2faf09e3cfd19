mod common;

use chrono::Utc;
use common::create_user;
use rateshelf::{
    api::api_error::ApiError,
    db::{DbPool, books::insert_book, init_memory_pool},
    models::{books::NewBook, reviews::ReviewDto, user::Role},
    services::reviews::{
        REVIEW_PAGE_SIZE, average_rating, list_reviews, record_review, review_page,
        top_rated_books,
    },
};

async fn book(db: &DbPool, title: &str) -> i64 {
    insert_book(
        db,
        &NewBook {
            title: title.into(),
            author: "Anon".into(),
            genre: None,
            published_date: None,
            summary: None,
            book_image_url: format!("/covers/{title}.png"),
        },
    )
    .await
    .unwrap()
    .id
}

fn review(book_id: i64, rating: i64) -> ReviewDto {
    ReviewDto {
        rating: Some(rating),
        book_id: Some(book_id),
        description: Some(format!("{rating} stars at {}", Utc::now())),
    }
}

#[tokio::test]
async fn no_reviews_averages_to_zero() {
    let db = init_memory_pool().await.unwrap();
    let book_id = book(&db, "Quiet").await;

    let summary = average_rating(&db, book_id).await.unwrap();
    assert_eq!(summary.average_rating, 0.0);
    assert_eq!(summary.count, 0);
}

#[tokio::test]
async fn recorded_review_shows_up_in_the_average() {
    let db = init_memory_pool().await.unwrap();
    let reader = create_user(&db, "reader", Role::User).await;
    let book_id = book(&db, "Dune").await;

    record_review(&db, reader.id, &review(book_id, 4)).await.unwrap();
    record_review(&db, reader.id, &review(book_id, 5)).await.unwrap();
    record_review(&db, reader.id, &review(book_id, 3)).await.unwrap();

    let summary = average_rating(&db, book_id).await.unwrap();
    assert_eq!(summary.count, 3);
    assert!((summary.average_rating - 4.0).abs() < 1e-9);
}

#[tokio::test]
async fn average_ignores_insertion_order() {
    let ratings = [5, 1, 4, 2, 2, 3];
    let mut averages = Vec::new();

    for order in [ratings.to_vec(), ratings.iter().rev().copied().collect()] {
        let db = init_memory_pool().await.unwrap();
        let reader = create_user(&db, "reader", Role::User).await;
        let book_id = book(&db, "Shuffled").await;
        for rating in order {
            record_review(&db, reader.id, &review(book_id, rating))
                .await
                .unwrap();
        }
        averages.push(average_rating(&db, book_id).await.unwrap());
    }

    assert_eq!(averages[0].count, averages[1].count);
    assert!((averages[0].average_rating - averages[1].average_rating).abs() < 1e-9);
}

#[tokio::test]
async fn reviews_for_other_books_do_not_leak_in() {
    let db = init_memory_pool().await.unwrap();
    let reader = create_user(&db, "reader", Role::User).await;
    let dune = book(&db, "Dune").await;
    let emma = book(&db, "Emma").await;

    record_review(&db, reader.id, &review(dune, 5)).await.unwrap();
    record_review(&db, reader.id, &review(emma, 1)).await.unwrap();

    let summary = average_rating(&db, dune).await.unwrap();
    assert_eq!(summary.count, 1);
    assert_eq!(summary.average_rating, 5.0);
}

#[tokio::test]
async fn review_for_missing_book_is_not_found() {
    let db = init_memory_pool().await.unwrap();
    let reader = create_user(&db, "reader", Role::User).await;

    assert!(matches!(
        record_review(&db, reader.id, &review(999, 4)).await,
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
async fn listing_keeps_creation_order_and_names_reviewers() {
    let db = init_memory_pool().await.unwrap();
    let alice = create_user(&db, "alice", Role::User).await;
    let bob = create_user(&db, "bob", Role::User).await;
    let book_id = book(&db, "Dune").await;

    record_review(&db, alice.id, &review(book_id, 5)).await.unwrap();
    record_review(&db, bob.id, &review(book_id, 3)).await.unwrap();

    let listed = list_reviews(&db, book_id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].rating, 5);
    assert_eq!(listed[0].reviewer_name, "alice Reader");
    assert_eq!(listed[1].rating, 3);
    assert_eq!(listed[1].reviewer_name, "bob Reader");
}

#[tokio::test]
async fn listing_an_unreviewed_book_is_not_found() {
    let db = init_memory_pool().await.unwrap();
    let book_id = book(&db, "Quiet").await;

    assert!(matches!(
        list_reviews(&db, book_id).await,
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        review_page(&db, book_id, 1).await,
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
async fn pages_hold_five_reviews() {
    let db = init_memory_pool().await.unwrap();
    let reader = create_user(&db, "reader", Role::User).await;
    let book_id = book(&db, "Long").await;

    for i in 0..12 {
        record_review(&db, reader.id, &review(book_id, i % 5 + 1))
            .await
            .unwrap();
    }

    let first = review_page(&db, book_id, 1).await.unwrap();
    assert_eq!(first.total, 12);
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.reviews.len() as i64, REVIEW_PAGE_SIZE);

    let last = review_page(&db, book_id, 3).await.unwrap();
    assert_eq!(last.reviews.len(), 2);

    let all = list_reviews(&db, book_id).await.unwrap();
    assert_eq!(first.reviews[0].id, all[0].id);
    assert_eq!(last.reviews[1].id, all[11].id);

    assert!(review_page(&db, book_id, 4).await.unwrap().reviews.is_empty());
    assert!(matches!(
        review_page(&db, book_id, 0).await,
        Err(ApiError::BadRequest(_))
    ));
}

#[tokio::test]
async fn top_rated_orders_by_average() {
    let db = init_memory_pool().await.unwrap();
    let reader = create_user(&db, "reader", Role::User).await;

    // Averages 4.8, 3.0, 5.0, 1.0, 4.0.
    let ratings: [&[i64]; 5] = [&[5, 5, 5, 5, 4], &[3], &[5, 5], &[1, 1], &[4, 4, 4]];
    let mut ids = Vec::new();
    for (i, book_ratings) in ratings.iter().enumerate() {
        let book_id = book(&db, &format!("Book {i}")).await;
        for rating in *book_ratings {
            record_review(&db, reader.id, &review(book_id, *rating))
                .await
                .unwrap();
        }
        ids.push(book_id);
    }

    let top = top_rated_books(&db, 3).await.unwrap();
    let top_ids: Vec<i64> = top.iter().map(|b| b.id).collect();
    assert_eq!(top_ids, vec![ids[2], ids[0], ids[4]]);
}

#[tokio::test]
async fn top_rated_ties_prefer_the_older_book() {
    let db = init_memory_pool().await.unwrap();
    let reader = create_user(&db, "reader", Role::User).await;
    let first = book(&db, "First").await;
    let second = book(&db, "Second").await;

    record_review(&db, reader.id, &review(second, 4)).await.unwrap();
    record_review(&db, reader.id, &review(first, 4)).await.unwrap();

    let top = top_rated_books(&db, 5).await.unwrap();
    let top_ids: Vec<i64> = top.iter().map(|b| b.id).collect();
    assert_eq!(top_ids, vec![first, second]);
    assert!(top_rated_books(&db, 0).await.unwrap().is_empty());
}
