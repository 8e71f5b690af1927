//! Project handler integration tests

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::common::{
    id_of, json_request, multipart_request, parse_body, png_bytes, truncated_png, MultipartBody,
    TestApp,
};

mod test_upload_project_with_image {
    use super::*;

    #[tokio::test]
    async fn test_upload_returns_201_and_project_is_retrievable() {
        let app = TestApp::new();

        let created = app.upload_project("Sunset").await;
        let id = id_of(&created);

        let resp = app
            .send(json_request(Method::GET, &format!("/projects/{}/", id), None))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = parse_body(resp).await;
        assert_eq!(body["id"], created["id"]);
        assert_eq!(body["title"], "Sunset");
        assert_eq!(body["description"], "");
        assert_eq!(body["image"]["id"], created["image"]["id"]);
    }

    #[tokio::test]
    async fn test_upload_response_nests_image() {
        let app = TestApp::new();

        let body = app.upload_project("Sunset").await;

        let image = &body["image"];
        assert_eq!(image["project"], body["id"]);
        assert_eq!(image["original_name"], "background.png");
        assert_eq!(image["content_type"], "image/png");
        assert_eq!(image["width"], 16);
        assert_eq!(image["height"], 9);
        assert_eq!(image["layers"], json!([]));

        let url = image["image_file"].as_str().unwrap();
        assert!(url.starts_with("/media/images/"));
        assert!(url.ends_with(".png"));
        assert_eq!(app.media.file_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_keeps_description() {
        let app = TestApp::new();
        let form = MultipartBody::new()
            .text("title", "Harbour")
            .text("description", "Boats at dawn")
            .file("image_file", "harbour.png", "image/png", png_bytes(4, 4));

        let resp = app
            .send(multipart_request(Method::POST, "/projects/upload/", form))
            .await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = parse_body(resp).await;
        assert_eq!(body["description"], "Boats at dawn");
    }

    #[tokio::test]
    async fn test_upload_missing_fields_returns_400_and_persists_nothing() {
        let app = TestApp::new();

        let resp = app
            .send(multipart_request(
                Method::POST,
                "/projects/upload/",
                MultipartBody::new(),
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["errors"]["title"][0], "This field is required.");
        assert_eq!(body["errors"]["image_file"][0], "No file was submitted.");

        assert_eq!(app.store.project_count(), 0);
        assert_eq!(app.store.image_count(), 0);
        assert_eq!(app.media.file_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_image_file() {
        let app = TestApp::new();
        let form = MultipartBody::new().text("title", "Notes").file(
            "image_file",
            "notes.png",
            "image/png",
            b"just some text".to_vec(),
        );

        let resp = app
            .send(multipart_request(Method::POST, "/projects/upload/", form))
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert_eq!(
            body["errors"]["image_file"][0],
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
        );
        assert!(body["errors"].get("title").is_none());
        assert_eq!(app.store.project_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_rejects_truncated_png() {
        let app = TestApp::new();
        let form = MultipartBody::new().text("title", "Torn").file(
            "image_file",
            "torn.png",
            "image/png",
            truncated_png(),
        );

        let resp = app
            .send(multipart_request(Method::POST, "/projects/upload/", form))
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert_eq!(
            body["errors"]["image_file"][0],
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
        );
        assert_eq!(app.store.project_count(), 0);
        assert_eq!(app.store.image_count(), 0);
        assert_eq!(app.media.file_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_file() {
        let app = TestApp::new();
        let form = MultipartBody::new()
            .text("title", "Empty")
            .file("image_file", "empty.png", "image/png", Vec::new());

        let resp = app
            .send(multipart_request(Method::POST, "/projects/upload/", form))
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert_eq!(body["errors"]["image_file"][0], "The submitted file is empty.");
    }

    #[tokio::test]
    async fn test_upload_storage_failure_returns_500() {
        let app = TestApp::new();
        app.media.set_fail_writes(true);
        let form = MultipartBody::new()
            .text("title", "Broken disk")
            .file("image_file", "a.png", "image/png", png_bytes(2, 2));

        let resp = app
            .send(multipart_request(Method::POST, "/projects/upload/", form))
            .await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = parse_body(resp).await;
        assert_eq!(body["code"], "STORAGE_ERROR");
        assert_eq!(body["detail"], "A server error occurred.");
        assert_eq!(app.store.project_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_json_body_rejected() {
        let app = TestApp::new();

        let resp = app
            .send(json_request(
                Method::POST,
                "/projects/upload/",
                Some(json!({"title": "x"})),
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

mod test_project_crud {
    use super::*;

    #[tokio::test]
    async fn test_create_project_without_image() {
        let app = TestApp::new();

        let resp = app
            .send(json_request(
                Method::POST,
                "/projects/",
                Some(json!({"title": "Blank canvas", "description": "todo"})),
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = parse_body(resp).await;
        assert_eq!(body["title"], "Blank canvas");
        assert_eq!(body["description"], "todo");
        assert!(body["image"].is_null());
    }

    #[tokio::test]
    async fn test_create_project_missing_title_returns_400() {
        let app = TestApp::new();

        let resp = app
            .send(json_request(Method::POST, "/projects/", Some(json!({}))))
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert_eq!(body["errors"]["title"][0], "This field is required.");
        assert_eq!(app.store.project_count(), 0);
    }

    #[tokio::test]
    async fn test_create_project_blank_title_returns_400() {
        let app = TestApp::new();

        let resp = app
            .send(json_request(
                Method::POST,
                "/projects/",
                Some(json!({"title": "   "})),
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert_eq!(body["errors"]["title"][0], "This field may not be blank.");
    }

    #[tokio::test]
    async fn test_create_project_title_too_long_returns_400() {
        let app = TestApp::new();

        let resp = app
            .send(json_request(
                Method::POST,
                "/projects/",
                Some(json!({"title": "a".repeat(256)})),
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert_eq!(
            body["errors"]["title"][0],
            "Ensure this field has no more than 255 characters."
        );
    }

    #[tokio::test]
    async fn test_list_projects_includes_images() {
        let app = TestApp::new();
        app.upload_project("With image").await;
        app.create_project("Without image").await;

        let resp = app
            .send(json_request(Method::GET, "/projects/", None))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = parse_body(resp).await;
        let projects = body.as_array().unwrap();
        assert_eq!(projects.len(), 2);

        let with_image = projects
            .iter()
            .find(|p| p["title"] == "With image")
            .unwrap();
        let without_image = projects
            .iter()
            .find(|p| p["title"] == "Without image")
            .unwrap();
        assert!(with_image["image"].is_object());
        assert!(without_image["image"].is_null());
    }

    #[tokio::test]
    async fn test_get_unknown_project_returns_404() {
        let app = TestApp::new();

        let resp = app
            .send(json_request(
                Method::GET,
                &format!("/projects/{}/", 999_999),
                None,
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = parse_body(resp).await;
        assert_eq!(body["detail"], "Project not found.");
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_ids_are_sequential_numbers() {
        let app = TestApp::new();

        let first = app.create_project("First").await;
        let second = app.upload_project("Second").await;

        assert!(first["id"].is_i64());
        assert_eq!(id_of(&second), id_of(&first) + 1);
        assert!(second["image"]["id"].is_i64());
        assert_eq!(second["image"]["project"], second["id"]);
    }

    #[tokio::test]
    async fn test_malformed_project_id_returns_404() {
        let app = TestApp::new();

        for method in [Method::GET, Method::PATCH, Method::DELETE] {
            let resp = app
                .send(json_request(
                    method.clone(),
                    "/projects/xyz/",
                    Some(json!({"title": "x"})),
                ))
                .await;

            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", method);
            let body = parse_body(resp).await;
            assert_eq!(body["code"], "NOT_FOUND");
            assert!(body["detail"].is_string());
        }
    }

    #[tokio::test]
    async fn test_put_requires_title() {
        let app = TestApp::new();
        let project = app.create_project("Old").await;

        let resp = app
            .send(json_request(
                Method::PUT,
                &format!("/projects/{}/", id_of(&project)),
                Some(json!({"description": "only description"})),
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert_eq!(body["errors"]["title"][0], "This field is required.");
    }

    #[tokio::test]
    async fn test_put_replaces_fields() {
        let app = TestApp::new();
        let project = app.create_project("Old").await;

        let resp = app
            .send(json_request(
                Method::PUT,
                &format!("/projects/{}/", id_of(&project)),
                Some(json!({"title": "New", "description": "Fresh"})),
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = parse_body(resp).await;
        assert_eq!(body["title"], "New");
        assert_eq!(body["description"], "Fresh");
    }

    #[tokio::test]
    async fn test_patch_updates_only_given_fields() {
        let app = TestApp::new();
        let project = app.upload_project("Keep me").await;

        let resp = app
            .send(json_request(
                Method::PATCH,
                &format!("/projects/{}/", id_of(&project)),
                Some(json!({"description": "Added later"})),
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = parse_body(resp).await;
        assert_eq!(body["title"], "Keep me");
        assert_eq!(body["description"], "Added later");
        assert_eq!(body["image"]["id"], project["image"]["id"]);
    }

    #[tokio::test]
    async fn test_patch_unknown_project_returns_404() {
        let app = TestApp::new();

        let resp = app
            .send(json_request(
                Method::PATCH,
                &format!("/projects/{}/", 999_999),
                Some(json!({"title": "x"})),
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

mod test_delete_project {
    use super::*;

    #[tokio::test]
    async fn test_delete_project_removes_image_and_layers() {
        let app = TestApp::new();
        let project = app.upload_project("Doomed").await;
        let image_id = id_of(&project["image"]);
        let layer = app.create_layer(image_id, 1).await;
        app.create_layer(image_id, 2).await;

        let resp = app
            .send(json_request(
                Method::DELETE,
                &format!("/projects/{}/", id_of(&project)),
                None,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        for uri in [
            format!("/projects/{}/", id_of(&project)),
            format!("/images/{}/", image_id),
            format!("/layers/{}/", id_of(&layer)),
        ] {
            let resp = app.send(json_request(Method::GET, &uri, None)).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{} still exists", uri);
        }

        assert_eq!(app.store.layer_count(), 0);
        assert_eq!(app.media.file_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_project_without_image() {
        let app = TestApp::new();
        let project = app.create_project("Empty").await;

        let resp = app
            .send(json_request(
                Method::DELETE,
                &format!("/projects/{}/", id_of(&project)),
                None,
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(app.store.project_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_project_returns_404() {
        let app = TestApp::new();

        let resp = app
            .send(json_request(
                Method::DELETE,
                &format!("/projects/{}/", 999_999),
                None,
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
