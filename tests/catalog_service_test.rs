mod common;

use bookstore_backend::dto::catalog_dto::{CategoryRequest, NewBookForm, UpdateBookRequest};
use bookstore_backend::dto::file_dto::UploadedFile;
use bookstore_backend::model::account::Account;
use bookstore_backend::model::category::Category;
use bookstore_backend::service::book_service::{BookService, MAX_BOOK_IMAGES};
use bookstore_backend::service::category_service::CategoryService;
use bookstore_backend::util::error::ServiceError;
use common::{harness, harness_with_storage, image, FakeStorage, TestHarness};

fn category_request(name: &str) -> CategoryRequest {
    CategoryRequest {
        name: name.to_string(),
        description: format!("Books about {}", name.to_lowercase()),
    }
}

fn book_form(title: &str, category: &str, images: Vec<UploadedFile>) -> NewBookForm {
    NewBookForm {
        title: Some(title.to_string()),
        price: Some("19.99".to_string()),
        description: Some("A fine book".to_string()),
        stock: Some("7".to_string()),
        category: Some(category.to_string()),
        images,
    }
}

fn images(count: usize) -> Vec<UploadedFile> {
    (0..count).map(|i| image(&format!("page-{}.png", i))).collect()
}

async fn category(h: &TestHarness, name: &str) -> Category {
    h.services.category_service.create(category_request(name)).await.unwrap()
}

async fn author(h: &TestHarness, name: &str, phone: &str) -> Account {
    h.verified_account(name, &format!("{}@example.com", name), phone, "author").await
}

#[tokio::test]
async fn test_category_create_and_duplicate() {
    let h = harness();
    let created = category(&h, "Fiction").await;
    assert!(created.id.is_some());

    let duplicate = h.services.category_service.create(category_request("Fiction")).await;
    assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));

    let blank = h
        .services
        .category_service
        .create(CategoryRequest {
            name: "   ".to_string(),
            description: "x".to_string(),
        })
        .await;
    assert!(matches!(blank, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn test_category_list_is_sorted_by_name() {
    let h = harness();
    category(&h, "Poetry").await;
    category(&h, "Fiction").await;
    category(&h, "History").await;

    let names: Vec<String> = h
        .services
        .category_service
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Fiction", "History", "Poetry"]);
}

#[tokio::test]
async fn test_category_update() {
    let h = harness();
    let fiction = category(&h, "Fiction").await;
    category(&h, "Poetry").await;
    let id = fiction.id.unwrap().to_hex();
    let service = &h.services.category_service;

    let renamed = service.update(&id, category_request("Novels")).await.unwrap();
    assert_eq!(renamed.name, "Novels");

    // Keeping its own name is not a conflict
    assert!(service.update(&id, category_request("Novels")).await.is_ok());

    assert!(matches!(
        service.update(&id, category_request("Poetry")).await,
        Err(ServiceError::Conflict(_))
    ));
    assert!(matches!(
        service.update("not-an-id", category_request("Drama")).await,
        Err(ServiceError::Validation(_))
    ));
    assert!(matches!(
        service
            .update(&bson::oid::ObjectId::new().to_hex(), category_request("Drama"))
            .await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_resolve_category_by_name_or_id() {
    let h = harness();
    let fiction = category(&h, "Fiction").await;
    let service = &h.services.category_service;

    let by_name = service.resolve_category("Fiction").await.unwrap();
    assert_eq!(by_name.id, fiction.id);

    let by_id = service.resolve_category(&fiction.id.unwrap().to_hex()).await.unwrap();
    assert_eq!(by_id.name, "Fiction");

    assert!(matches!(
        service.resolve_category("Cookbooks").await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(service.resolve_category("  ").await, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn test_create_book_and_list_with_references() {
    let h = harness();
    let fiction = category(&h, "Fiction").await;
    let writer = author(&h, "writer", "1111111111").await;

    let book = h
        .services
        .book_service
        .create(book_form("Dune", "Fiction", images(2)), &writer)
        .await
        .unwrap();
    assert_eq!(book.owner, writer.id.unwrap());
    assert_eq!(book.category, fiction.id.unwrap());
    assert_eq!(book.price, 19.99);
    assert_eq!(book.stock, 7);
    assert_eq!(book.images.len(), 2);
    for url in &book.images {
        assert!(h.storage.stored().contains(url));
    }

    let views = h.services.book_service.list().await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].category.as_ref().unwrap().name, "Fiction");
    assert_eq!(views[0].owner.as_ref().unwrap().user_name, "writer");
}

#[tokio::test]
async fn test_create_book_by_category_id() {
    let h = harness();
    let fiction = category(&h, "Fiction").await;
    let writer = author(&h, "writer", "1111111111").await;

    let book = h
        .services
        .book_service
        .create(book_form("Dune", &fiction.id.unwrap().to_hex(), images(1)), &writer)
        .await
        .unwrap();
    assert_eq!(book.category, fiction.id.unwrap());
}

#[tokio::test]
async fn test_duplicate_title_is_scoped_to_category() {
    let h = harness();
    category(&h, "Fiction").await;
    category(&h, "Classics").await;
    let writer = author(&h, "writer", "1111111111").await;
    let books = &h.services.book_service;

    books.create(book_form("Dune", "Fiction", images(1)), &writer).await.unwrap();

    let duplicate = books.create(book_form("Dune", "Fiction", images(1)), &writer).await;
    assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));
    // Rejected before anything was uploaded: the avatar plus the first book's image
    assert_eq!(h.storage.stored().len(), 2);

    assert!(books.create(book_form("Dune", "Classics", images(1)), &writer).await.is_ok());
    assert_eq!(h.books.count(), 2);
}

#[tokio::test]
async fn test_create_book_image_count_bounds() {
    let h = harness();
    category(&h, "Fiction").await;
    let writer = author(&h, "writer", "1111111111").await;
    let books = &h.services.book_service;

    assert!(matches!(
        books.create(book_form("Dune", "Fiction", vec![]), &writer).await,
        Err(ServiceError::Validation(_))
    ));
    assert!(matches!(
        books
            .create(book_form("Dune", "Fiction", images(MAX_BOOK_IMAGES + 1)), &writer)
            .await,
        Err(ServiceError::Validation(_))
    ));
    assert_eq!(h.storage.stored(), vec![writer.avatar.clone()]);

    assert!(books
        .create(book_form("Dune", "Fiction", images(MAX_BOOK_IMAGES)), &writer)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_create_book_rejects_bad_fields() {
    let h = harness();
    category(&h, "Fiction").await;
    let writer = author(&h, "writer", "1111111111").await;
    let books = &h.services.book_service;

    let mut missing = book_form("Dune", "Fiction", images(1));
    missing.description = None;
    assert!(matches!(books.create(missing, &writer).await, Err(ServiceError::Validation(_))));

    for price in ["abc", "-1"] {
        let mut form = book_form("Dune", "Fiction", images(1));
        form.price = Some(price.to_string());
        assert!(matches!(books.create(form, &writer).await, Err(ServiceError::Validation(_))));
    }

    let mut form = book_form("Dune", "Fiction", images(1));
    form.stock = Some("2.5".to_string());
    assert!(matches!(books.create(form, &writer).await, Err(ServiceError::Validation(_))));

    assert!(matches!(
        books.create(book_form("Dune", "Cookbooks", images(1)), &writer).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_failed_upload_rolls_back_stored_images() {
    let h = harness_with_storage(FakeStorage::failing_on(3));
    category(&h, "Fiction").await;
    // Registration's avatar upload is call 1, so the book's second image fails
    let writer = author(&h, "writer", "1111111111").await;
    let avatar = writer.avatar.clone();

    let result = h
        .services
        .book_service
        .create(book_form("Dune", "Fiction", images(3)), &writer)
        .await;
    assert!(matches!(result, Err(ServiceError::Upload(_))));
    assert_eq!(h.books.count(), 0);

    assert_eq!(h.storage.stored(), vec![avatar]);
    assert_eq!(h.storage.removed().len(), 1);
}

#[tokio::test]
async fn test_update_book_ownership() {
    let h = harness();
    category(&h, "Fiction").await;
    let writer = author(&h, "writer", "1111111111").await;
    let rival = author(&h, "rival", "2222222222").await;
    let admin = h.admin().await;
    let books = &h.services.book_service;

    let book = books.create(book_form("Dune", "Fiction", images(1)), &writer).await.unwrap();
    let id = book.id.unwrap().to_hex();

    let price_change = UpdateBookRequest {
        price: Some(9.5),
        ..Default::default()
    };
    assert!(matches!(
        books.update(&id, price_change.clone(), &rival).await,
        Err(ServiceError::Forbidden(_))
    ));

    let updated = books.update(&id, price_change, &writer).await.unwrap();
    assert_eq!(updated.price, 9.5);

    let by_admin = books
        .update(
            &id,
            UpdateBookRequest {
                stock: Some(0),
                ..Default::default()
            },
            &admin,
        )
        .await
        .unwrap();
    assert_eq!(by_admin.stock, 0);
    assert_eq!(by_admin.owner, writer.id.unwrap());
}

#[tokio::test]
async fn test_update_book_validation_and_uniqueness() {
    let h = harness();
    category(&h, "Fiction").await;
    category(&h, "Classics").await;
    let writer = author(&h, "writer", "1111111111").await;
    let books = &h.services.book_service;

    books.create(book_form("Dune", "Fiction", images(1)), &writer).await.unwrap();
    let emma = books.create(book_form("Emma", "Fiction", images(1)), &writer).await.unwrap();
    let id = emma.id.unwrap().to_hex();

    assert!(matches!(
        books.update(&id, UpdateBookRequest::default(), &writer).await,
        Err(ServiceError::Validation(_))
    ));
    assert!(matches!(
        books
            .update(
                &id,
                UpdateBookRequest {
                    title: Some("Dune".to_string()),
                    ..Default::default()
                },
                &writer
            )
            .await,
        Err(ServiceError::Conflict(_))
    ));

    // Same title is fine once it moves to another category
    let moved = books
        .update(
            &id,
            UpdateBookRequest {
                title: Some("Dune".to_string()),
                category: Some("Classics".to_string()),
                ..Default::default()
            },
            &writer,
        )
        .await
        .unwrap();
    assert_eq!(moved.title, "Dune");

    assert!(matches!(
        books.update("123", UpdateBookRequest::default(), &writer).await,
        Err(ServiceError::Validation(_))
    ));
    assert!(matches!(
        books
            .update(
                &bson::oid::ObjectId::new().to_hex(),
                UpdateBookRequest {
                    stock: Some(1),
                    ..Default::default()
                },
                &writer
            )
            .await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_book_removes_images() {
    let h = harness();
    category(&h, "Fiction").await;
    let writer = author(&h, "writer", "1111111111").await;
    let rival = author(&h, "rival", "2222222222").await;
    let books = &h.services.book_service;

    let book = books.create(book_form("Dune", "Fiction", images(2)), &writer).await.unwrap();
    let id = book.id.unwrap().to_hex();

    assert!(matches!(books.delete(&id, &rival).await, Err(ServiceError::Forbidden(_))));

    let deleted = books.delete(&id, &writer).await.unwrap();
    assert_eq!(deleted.title, "Dune");
    assert_eq!(h.books.count(), 0);
    for url in &book.images {
        assert!(h.storage.removed().contains(url));
    }
    assert!(matches!(books.delete(&id, &writer).await, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_deleting_category_leaves_books_in_place() {
    let h = harness();
    let fiction = category(&h, "Fiction").await;
    let writer = author(&h, "writer", "1111111111").await;

    h.services
        .book_service
        .create(book_form("Dune", "Fiction", images(1)), &writer)
        .await
        .unwrap();

    let deleted = h
        .services
        .category_service
        .delete(&fiction.id.unwrap().to_hex())
        .await
        .unwrap();
    assert_eq!(deleted.name, "Fiction");

    let views = h.services.book_service.list().await.unwrap();
    assert_eq!(views.len(), 1);
    assert!(views[0].category.is_none());
}
