use sha2::{Digest, Sha256};

use crate::common::{TestApp, routes};

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn lecturer_can_upload_material() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv01", "pass1234", "lecturer")
            .await;

        let payload = b"week 1 lecture".to_vec();
        let res = app
            .upload_material("Week 1", "CNTT", "CS101", "week1.pdf", payload.clone(), &token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["msg"].as_str().unwrap(), "Upload successful");
        assert_eq!(
            res.body["fingerprint"].as_str().unwrap(),
            sha256_hex(&payload)
        );
        assert!(res.body["id"].as_i64().is_some());
        assert_eq!(app.count_blobs(), 1);
    }

    #[tokio::test]
    async fn upload_hello_end_to_end() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv02", "pass1234", "lecturer")
            .await;

        let res = app
            .upload_material("doc1", "CNTT", "CS101", "doc1.txt", b"hello".to_vec(), &token)
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(
            res.body["fingerprint"].as_str().unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );

        let id = res.id();
        let fetched = app.get_raw(&routes::material_download(id)).await;
        assert_eq!(fetched.status().as_u16(), 200);
        assert_eq!(fetched.bytes().await.unwrap().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn duplicate_payload_is_rejected_once_stored() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv03", "pass1234", "lecturer")
            .await;

        let payload = b"identical bytes".to_vec();
        let first = app
            .upload_material("Original", "CNTT", "CS101", "a.pdf", payload.clone(), &token)
            .await;
        assert_eq!(first.status, 201, "{}", first.text);

        // Different descriptive fields, same payload.
        let second = app
            .upload_material("Other name", "KT", "EC202", "b.pdf", payload, &token)
            .await;
        assert_eq!(second.status, 400);
        assert_eq!(second.code(), "DUPLICATE_CONTENT");

        // Exactly one material and one blob survive.
        let list = app.get_with_token(routes::MATERIALS, &token).await;
        assert_eq!(list.body["data"].as_array().unwrap().len(), 1);
        assert_eq!(app.count_blobs(), 1);
    }

    #[tokio::test]
    async fn student_cannot_upload() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("hv01", "pass1234").await;

        let res = app
            .upload_material("Notes", "CNTT", "CS101", "n.pdf", b"data".to_vec(), &token)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.code(), "PERMISSION_DENIED");
        assert_eq!(app.count_blobs(), 0);
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv04", "pass1234", "lecturer")
            .await;

        let form = reqwest::multipart::Form::new()
            .text("name", "Notes")
            .text("department", "CNTT")
            .text("course_code", "CS101");
        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::MATERIALS))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn missing_name_field_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv05", "pass1234", "lecturer")
            .await;

        let part = reqwest::multipart::Part::bytes(b"data".to_vec()).file_name("d.pdf");
        let form = reqwest::multipart::Form::new()
            .text("department", "CNTT")
            .text("course_code", "CS101")
            .part("file", part);
        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::MATERIALS))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 400);
        assert_eq!(app.count_blobs(), 0);
    }

    #[tokio::test]
    async fn zero_byte_payload_is_permitted() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv06", "pass1234", "lecturer")
            .await;

        let res = app
            .upload_material("Empty", "CNTT", "CS101", "empty.txt", Vec::new(), &token)
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        let list = app.get_with_token(routes::MATERIALS, &token).await;
        let size_kb = list.body["data"][0]["size_kb"].as_f64().unwrap();
        assert_eq!(size_kb, 0.0);
    }

    #[tokio::test]
    async fn size_kb_preserves_fractions() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv07", "pass1234", "lecturer")
            .await;

        let res = app
            .upload_material("2k", "CNTT", "CS101", "2k.bin", vec![0xAB; 2048], &token)
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        let two_k = res.id();

        let res = app
            .upload_material("1b", "CNTT", "CS101", "1b.bin", vec![0x01], &token)
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        let one_b = res.id();

        let list = app.get_with_token(routes::MATERIALS, &token).await;
        for item in list.body["data"].as_array().unwrap() {
            let id = item["id"].as_i64().unwrap() as i32;
            let size_kb = item["size_kb"].as_f64().unwrap();
            if id == two_k {
                assert_eq!(size_kb, 2.0);
            } else if id == one_b {
                assert_eq!(size_kb, 1.0 / 1024.0);
            }
        }
    }
}

mod list {
    use super::*;

    #[tokio::test]
    async fn list_is_newest_first_and_reports_role() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv08", "pass1234", "lecturer")
            .await;

        let first = app.seed_material(&token, "Older", b"payload one").await;
        let second = app.seed_material(&token, "Newer", b"payload two").await;

        let list = app.get_with_token(routes::MATERIALS, &token).await;
        assert_eq!(list.status, 200, "{}", list.text);
        assert_eq!(list.body["role"].as_str().unwrap(), "lecturer");

        let data = list.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["id"].as_i64().unwrap() as i32, second);
        assert_eq!(data[1]["id"].as_i64().unwrap() as i32, first);
    }

    #[tokio::test]
    async fn students_can_list() {
        let app = TestApp::spawn().await;
        let lecturer = app
            .create_user_with_role("gv09", "pass1234", "lecturer")
            .await;
        app.seed_material(&lecturer, "Shared", b"shared payload")
            .await;

        let student = app.create_authenticated_user("hv02", "pass1234").await;
        let list = app.get_with_token(routes::MATERIALS, &student).await;

        assert_eq!(list.status, 200);
        assert_eq!(list.body["role"].as_str().unwrap(), "student");
        assert_eq!(list.body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn listing_requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::MATERIALS).await;
        assert_eq!(res.status, 401);
    }
}

mod fetch {
    use super::*;

    #[tokio::test]
    async fn download_streams_bytes_with_attachment_disposition() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv10", "pass1234", "lecturer")
            .await;
        let id = app.seed_material(&token, "Dl", b"download me").await;

        let res = app.get_raw(&routes::material_download(id)).await;
        assert_eq!(res.status().as_u16(), 200);

        let disposition = res
            .headers()
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment;"), "{disposition}");

        let length: u64 = res
            .headers()
            .get("content-length")
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(length, b"download me".len() as u64);

        assert_eq!(res.bytes().await.unwrap().as_ref(), b"download me");
    }

    #[tokio::test]
    async fn view_is_inline_with_percent_encoded_filename() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv11", "pass1234", "lecturer")
            .await;

        let res = app
            .upload_material(
                "Vietnamese filename",
                "CNTT",
                "CS101",
                "bài giảng.pdf",
                b"pdf bytes".to_vec(),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        let id = res.id();

        let res = app.get_raw(&routes::material_view(id)).await;
        assert_eq!(res.status().as_u16(), 200);

        let disposition = res
            .headers()
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("inline;"), "{disposition}");
        assert!(
            disposition.contains("filename*=UTF-8''b%C3%A0i%20gi%E1%BA%A3ng.pdf"),
            "{disposition}"
        );
    }

    #[tokio::test]
    async fn fetch_unknown_id_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(&routes::material_download(4242)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");

        let res = app.get_without_token(&routes::material_view(4242)).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn fetch_requires_no_authentication() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv12", "pass1234", "lecturer")
            .await;
        let id = app.seed_material(&token, "Public", b"public bytes").await;

        let res = app.get_raw(&routes::material_download(id)).await;
        assert_eq!(res.status().as_u16(), 200);
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn update_fields_only_keeps_blob_and_fingerprint() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv13", "pass1234", "lecturer")
            .await;
        let payload = b"stable payload";
        let id = app.seed_material(&token, "Before", payload).await;

        let res = app
            .update_material(id, "After", "KT", "EC202", None, &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let list = app.get_with_token(routes::MATERIALS, &token).await;
        let item = &list.body["data"][0];
        assert_eq!(item["id"].as_i64().unwrap() as i32, id);
        assert_eq!(item["name"].as_str().unwrap(), "After");
        assert_eq!(item["department"].as_str().unwrap(), "KT");
        assert_eq!(item["course_code"].as_str().unwrap(), "EC202");
        assert_eq!(
            item["content_fingerprint"].as_str().unwrap(),
            sha256_hex(payload)
        );
        assert_eq!(item["original_filename"].as_str().unwrap(), "doc.pdf");

        // The blob is untouched and still downloadable.
        assert_eq!(app.count_blobs(), 1);
        let fetched = app.get_raw(&routes::material_download(id)).await;
        assert_eq!(fetched.bytes().await.unwrap().as_ref(), payload);
    }

    #[tokio::test]
    async fn update_with_file_swaps_blob_and_keeps_id() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv14", "pass1234", "lecturer")
            .await;
        let id = app.seed_material(&token, "Doc", b"version one").await;

        let res = app
            .update_material(
                id,
                "Doc",
                "CNTT",
                "CS101",
                Some(("v2.pdf", b"version two".to_vec())),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        // Same id, new content, new fingerprint, and the old blob is gone.
        let list = app.get_with_token(routes::MATERIALS, &token).await;
        let data = list.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"].as_i64().unwrap() as i32, id);
        assert_eq!(
            data[0]["content_fingerprint"].as_str().unwrap(),
            sha256_hex(b"version two")
        );
        assert_eq!(data[0]["original_filename"].as_str().unwrap(), "v2.pdf");
        assert_eq!(app.count_blobs(), 1);

        let fetched = app.get_raw(&routes::material_download(id)).await;
        assert_eq!(fetched.bytes().await.unwrap().as_ref(), b"version two");
    }

    #[tokio::test]
    async fn update_rejects_payload_duplicating_another_material() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv15", "pass1234", "lecturer")
            .await;
        app.seed_material(&token, "A", b"payload A").await;
        let b = app.seed_material(&token, "B", b"payload B").await;

        let res = app
            .update_material(
                b,
                "B",
                "CNTT",
                "CS101",
                Some(("clone.pdf", b"payload A".to_vec())),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "DUPLICATE_CONTENT");
        // Both original blobs still present, no stray copy.
        assert_eq!(app.count_blobs(), 2);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv16", "pass1234", "lecturer")
            .await;

        let res = app
            .update_material(9999, "X", "CNTT", "CS101", None, &token)
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn student_cannot_update() {
        let app = TestApp::spawn().await;
        let lecturer = app
            .create_user_with_role("gv17", "pass1234", "lecturer")
            .await;
        let id = app.seed_material(&lecturer, "Doc", b"original").await;

        let student = app.create_authenticated_user("hv03", "pass1234").await;
        let res = app
            .update_material(id, "Hacked", "CNTT", "CS101", None, &student)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.code(), "PERMISSION_DENIED");
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn delete_removes_record_and_blob() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv18", "pass1234", "lecturer")
            .await;
        let id = app.seed_material(&token, "Doomed", b"to be deleted").await;
        assert_eq!(app.count_blobs(), 1);

        let res = app.delete_with_token(&routes::material(id), &token).await;
        assert_eq!(res.status, 204, "{}", res.text);

        let list = app.get_with_token(routes::MATERIALS, &token).await;
        assert!(list.body["data"].as_array().unwrap().is_empty());
        assert_eq!(app.count_blobs(), 0);

        let fetched = app.get_without_token(&routes::material_download(id)).await;
        assert_eq!(fetched.status, 404);
    }

    #[tokio::test]
    async fn delete_frees_fingerprint_for_reupload() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv19", "pass1234", "lecturer")
            .await;
        let id = app.seed_material(&token, "First life", b"recycled").await;

        let res = app.delete_with_token(&routes::material(id), &token).await;
        assert_eq!(res.status, 204);

        let res = app
            .upload_material("Second life", "CNTT", "CS101", "again.pdf", b"recycled".to_vec(), &token)
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
    }

    #[tokio::test]
    async fn delete_unknown_id_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app
            .create_user_with_role("gv20", "pass1234", "lecturer")
            .await;

        let res = app.delete_with_token(&routes::material(777), &token).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn student_cannot_delete() {
        let app = TestApp::spawn().await;
        let lecturer = app
            .create_user_with_role("gv21", "pass1234", "lecturer")
            .await;
        let id = app.seed_material(&lecturer, "Safe", b"kept").await;

        let student = app.create_authenticated_user("hv04", "pass1234").await;
        let res = app.delete_with_token(&routes::material(id), &student).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.code(), "PERMISSION_DENIED");
        assert_eq!(app.count_blobs(), 1);
    }
}
