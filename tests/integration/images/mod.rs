//! Image handler integration tests

use axum::http::{Method, StatusCode};
use image::ImageOutputFormat;
use serde_json::json;

use crate::common::{
    encode, id_of, json_request, multipart_request, parse_body, png_bytes, MultipartBody, TestApp,
};

const CONFLICT_DETAIL: &str =
    "This project already has an image. Delete the existing image before uploading a new one.";

/// Path of a stored file, from its public URL
fn stored_path(image: &serde_json::Value) -> String {
    image["image_file"]
        .as_str()
        .unwrap()
        .trim_start_matches("/media/")
        .to_string()
}

mod test_upload_to_project {
    use super::*;

    #[tokio::test]
    async fn test_upload_returns_201_and_image_is_retrievable() {
        let app = TestApp::new();
        let project = app.create_project("Fresh").await;

        let resp = app.upload_image(id_of(&project)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = parse_body(resp).await;
        assert_eq!(created["project"], project["id"]);
        assert_eq!(created["layers"], json!([]));

        let resp = app
            .send(json_request(
                Method::GET,
                &format!("/images/{}/", id_of(&created)),
                None,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = parse_body(resp).await;
        assert_eq!(body["id"], created["id"]);
        assert_eq!(body["image_file"], created["image_file"]);
    }

    #[tokio::test]
    async fn test_second_upload_returns_400_and_keeps_original() {
        let app = TestApp::new();
        let project = app.upload_project("Taken").await;
        let original = project["image"].clone();

        let resp = app.upload_image(id_of(&project)).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert_eq!(body["detail"], CONFLICT_DETAIL);
        assert_eq!(body["code"], "CONFLICT");

        let resp = app
            .send(json_request(
                Method::GET,
                &format!("/images/{}/", id_of(&original)),
                None,
            ))
            .await;
        let current = parse_body(resp).await;
        assert_eq!(current["image_file"], original["image_file"]);
        assert_eq!(current["updated_at"], original["updated_at"]);
        assert_eq!(app.store.image_count(), 1);
        assert_eq!(app.media.file_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_to_unknown_project_returns_field_error() {
        let app = TestApp::new();
        let missing = 999_999;

        let resp = app.upload_image(missing).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert_eq!(
            body["errors"]["project"][0],
            format!("Invalid pk \"{}\" - object does not exist.", missing)
        );
        assert_eq!(app.media.file_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_with_malformed_project_id() {
        let app = TestApp::new();

        let resp = app.upload_image("not-a-number").await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert_eq!(
            body["errors"]["project"][0],
            "Incorrect type. Expected pk value, received str."
        );
    }

    #[tokio::test]
    async fn test_upload_missing_fields_returns_400() {
        let app = TestApp::new();

        let resp = app
            .send(multipart_request(
                Method::POST,
                "/images/upload-to-project/",
                MultipartBody::new(),
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert_eq!(body["errors"]["project"][0], "This field is required.");
        assert_eq!(body["errors"]["image_file"][0], "No file was submitted.");
        assert_eq!(app.store.image_count(), 0);
    }

    #[tokio::test]
    async fn test_format_detected_from_bytes() {
        let app = TestApp::new();
        let project = app.create_project("Jpeg").await;
        let form = MultipartBody::new()
            .text("project", &id_of(&project).to_string())
            .file(
                "image_file",
                "misnamed.png",
                "image/png",
                encode(5, 7, ImageOutputFormat::Jpeg(90)),
            );

        let resp = app
            .send(multipart_request(
                Method::POST,
                "/images/upload-to-project/",
                form,
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = parse_body(resp).await;
        assert_eq!(body["content_type"], "image/jpeg");
        assert_eq!(body["original_name"], "misnamed.png");
        assert_eq!((body["width"].clone(), body["height"].clone()), (json!(5), json!(7)));
        assert!(body["image_file"].as_str().unwrap().ends_with(".jpg"));
    }
}

mod test_image_crud {
    use super::*;

    #[tokio::test]
    async fn test_create_image_returns_201() {
        let app = TestApp::new();
        let project = app.create_project("Plain create").await;
        let form = MultipartBody::new()
            .text("project", &id_of(&project).to_string())
            .file("image_file", "a.png", "image/png", png_bytes(3, 3));

        let resp = app
            .send(multipart_request(Method::POST, "/images/", form))
            .await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = parse_body(resp).await;
        assert_eq!(body["project"], project["id"]);
    }

    #[tokio::test]
    async fn test_create_image_duplicate_rejected_by_constraint() {
        let app = TestApp::new();
        let project = app.upload_project("Has one").await;
        let form = MultipartBody::new()
            .text("project", &id_of(&project).to_string())
            .file("image_file", "b.png", "image/png", png_bytes(3, 3));

        let resp = app
            .send(multipart_request(Method::POST, "/images/", form))
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert_eq!(body["detail"], CONFLICT_DETAIL);
        assert_eq!(app.store.image_count(), 1);
        // The file written before the insert failed is removed again
        assert_eq!(app.media.file_count(), 1);
    }

    #[tokio::test]
    async fn test_list_images_with_layers() {
        let app = TestApp::new();
        let a = app.upload_project("A").await;
        app.upload_project("B").await;
        let image_a = id_of(&a["image"]);
        app.create_layer(image_a, 2).await;
        app.create_layer(image_a, 1).await;

        let resp = app.send(json_request(Method::GET, "/images/", None)).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = parse_body(resp).await;
        let images = body.as_array().unwrap();
        assert_eq!(images.len(), 2);

        let listed_a = images.iter().find(|i| i["id"] == a["image"]["id"]).unwrap();
        let order: Vec<i64> = listed_a["layers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["layer_id"].as_i64().unwrap())
            .collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_get_unknown_image_returns_404() {
        let app = TestApp::new();

        let resp = app
            .send(json_request(
                Method::GET,
                &format!("/images/{}/", 999_999),
                None,
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = parse_body(resp).await;
        assert_eq!(body["detail"], "Image not found.");
    }

    #[tokio::test]
    async fn test_get_malformed_image_id_returns_404() {
        let app = TestApp::new();

        let resp = app
            .send(json_request(Method::GET, "/images/abc/", None))
            .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = parse_body(resp).await;
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_patch_replaces_file_and_removes_previous() {
        let app = TestApp::new();
        let project = app.upload_project("Swap").await;
        let image = project["image"].clone();
        let old_path = stored_path(&image);

        let form = MultipartBody::new().file(
            "image_file",
            "new.bmp",
            "image/bmp",
            encode(12, 3, ImageOutputFormat::Bmp),
        );
        let resp = app
            .send(multipart_request(
                Method::PATCH,
                &format!("/images/{}/", id_of(&image)),
                form,
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = parse_body(resp).await;
        assert_eq!(body["content_type"], "image/bmp");
        assert_eq!(body["width"], 12);
        assert_eq!(body["project"], project["id"]);

        let new_path = stored_path(&body);
        assert_ne!(new_path, old_path);
        assert!(app.media.contains(&new_path));
        assert!(!app.media.contains(&old_path));
    }

    #[tokio::test]
    async fn test_patch_moves_image_to_free_project() {
        let app = TestApp::new();
        let source = app.upload_project("Source").await;
        let target = app.create_project("Target").await;

        let form = MultipartBody::new().text("project", &id_of(&target).to_string());
        let resp = app
            .send(multipart_request(
                Method::PATCH,
                &format!("/images/{}/", id_of(&source["image"])),
                form,
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = parse_body(resp).await;
        assert_eq!(body["project"], target["id"]);
    }

    #[tokio::test]
    async fn test_patch_move_onto_taken_project_is_conflict() {
        let app = TestApp::new();
        let a = app.upload_project("A").await;
        let b = app.upload_project("B").await;

        let form = MultipartBody::new().text("project", &id_of(&b).to_string());
        let resp = app
            .send(multipart_request(
                Method::PATCH,
                &format!("/images/{}/", id_of(&a["image"])),
                form,
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert_eq!(body["code"], "CONFLICT");
        assert_eq!(body["detail"], CONFLICT_DETAIL);
    }

    #[tokio::test]
    async fn test_put_requires_both_fields() {
        let app = TestApp::new();
        let project = app.upload_project("Put").await;

        let resp = app
            .send(multipart_request(
                Method::PUT,
                &format!("/images/{}/", id_of(&project["image"])),
                MultipartBody::new(),
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = parse_body(resp).await;
        assert!(body["errors"]["project"].is_array());
        assert!(body["errors"]["image_file"].is_array());
    }

    #[tokio::test]
    async fn test_delete_image_returns_204_and_cascades() {
        let app = TestApp::new();
        let project = app.upload_project("Delete").await;
        let image_id = id_of(&project["image"]);
        app.create_layer(image_id, 1).await;

        let resp = app
            .send(json_request(
                Method::DELETE,
                &format!("/images/{}/", image_id),
                None,
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(app.store.image_count(), 0);
        assert_eq!(app.store.layer_count(), 0);
        assert_eq!(app.store.project_count(), 1);
    }
}

mod test_delete_with_layers {
    use super::*;

    #[tokio::test]
    async fn test_delete_with_layers_returns_204_and_removes_everything() {
        let app = TestApp::new();
        let project = app.upload_project("Layered").await;
        let image_id = id_of(&project["image"]);
        let layers = vec![
            app.create_layer(image_id, 1).await,
            app.create_layer(image_id, 2).await,
            app.create_layer(image_id, 3).await,
        ];

        let resp = app
            .send(json_request(
                Method::DELETE,
                &format!("/images/{}/delete-with-layers/", image_id),
                None,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app
            .send(json_request(
                Method::GET,
                &format!("/images/{}/", image_id),
                None,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        for layer in &layers {
            let resp = app
                .send(json_request(
                    Method::GET,
                    &format!("/layers/{}/", id_of(layer)),
                    None,
                ))
                .await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }

        assert_eq!(app.media.file_count(), 0);
        // The project itself survives without an image
        let resp = app
            .send(json_request(
                Method::GET,
                &format!("/projects/{}/", id_of(&project)),
                None,
            ))
            .await;
        let body = parse_body(resp).await;
        assert!(body["image"].is_null());
    }

    #[tokio::test]
    async fn test_delete_with_layers_leaves_other_images_alone() {
        let app = TestApp::new();
        let doomed = app.upload_project("Doomed").await;
        let kept = app.upload_project("Kept").await;
        let kept_layer = app.create_layer(id_of(&kept["image"]), 1).await;

        let resp = app
            .send(json_request(
                Method::DELETE,
                &format!("/images/{}/delete-with-layers/", id_of(&doomed["image"])),
                None,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app
            .send(json_request(
                Method::GET,
                &format!("/layers/{}/", id_of(&kept_layer)),
                None,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_delete_with_layers_unknown_image_returns_404() {
        let app = TestApp::new();

        let resp = app
            .send(json_request(
                Method::DELETE,
                &format!("/images/{}/delete-with-layers/", 999_999),
                None,
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = parse_body(resp).await;
        assert_eq!(body["detail"], "Image not found.");
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_with_layers_malformed_id_returns_404() {
        let app = TestApp::new();
        app.upload_project("Survivor").await;

        let resp = app
            .send(json_request(
                Method::DELETE,
                "/images/abc/delete-with-layers/",
                None,
            ))
            .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = parse_body(resp).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert!(body["detail"].is_string());
        assert_eq!(app.store.image_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_with_layers_then_upload_again() {
        let app = TestApp::new();
        let project = app.upload_project("Retry").await;

        let resp = app
            .send(json_request(
                Method::DELETE,
                &format!("/images/{}/delete-with-layers/", id_of(&project["image"])),
                None,
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app.upload_image(id_of(&project)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
}
