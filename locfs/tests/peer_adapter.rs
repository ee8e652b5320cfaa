//! Chains two live servers: `front` serves a peer location backed by the
//! filesystem location of `back`.

mod common;

use axum::body::{Body, Bytes};
use axum::http::StatusCode;
use common::*;
use locfs::client::PeerClient;
use locfs::domain::{ChunkOptions, CopyOptions, Location, PeerLocation};
use locfs::error::{AppError, ErrorKind};
use locfs::storage::Adapter;
use locfs::storage::driver::filesystem::FilesystemAdapter;
use locfs::storage::driver::peer::PeerAdapter;
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

struct Chain {
    tmp: TempDir,
    back_origin: String,
    front: axum::Router,
}

async fn chain() -> Chain {
    let tmp = tempfile::tempdir().unwrap();
    let back = app(config(vec![fs_location(&tmp, "one"), fs_location(&tmp, "two")]));
    let back_origin = spawn(back).await;

    let front = app(config(vec![
        Location::peer("remote", "Remote One", back_origin.as_str(), "one"),
        Location::peer("remote2", "Remote Two", back_origin.as_str(), "two"),
        fs_location(&tmp, "local"),
    ]));
    Chain {
        tmp,
        back_origin,
        front,
    }
}

#[tokio::test]
async fn test_peer_client_round_trip() {
    let chain = chain().await;
    let client = PeerClient::new(&format!("{}/api", chain.back_origin)).unwrap();

    let ids: Vec<String> = client
        .locations()
        .await
        .unwrap()
        .iter()
        .map(|loc| loc.id().to_string())
        .collect();
    assert_eq!(ids, vec!["one", "two"]);

    client
        .write_file("one", "dir/abc.txt", Bytes::from_static(ALPHABET), Some("text/plain"))
        .await
        .unwrap();
    assert!(client.exists("one", "dir/abc.txt").await.unwrap());
    assert!(!client.exists("one", "dir/nope.txt").await.unwrap());

    let chunk = client
        .read_file_chunk("one", "dir/abc.txt", ChunkOptions::new(5, Some(6)))
        .await
        .unwrap();
    assert_eq!(&chunk.data[..], b"fghijk");
    assert_eq!((chunk.chunk_start, chunk.chunk_end, chunk.file_size), (5, 10, 26));
    assert_eq!(chunk.mime_type, "text/plain");

    let whole = client
        .read_file_chunk("one", "dir/abc.txt", ChunkOptions::default())
        .await
        .unwrap();
    assert!(whole.is_complete());
    assert_eq!((whole.chunk_start, whole.chunk_end), (0, 25));

    let tail = client.read_file_suffix("one", "dir/abc.txt", 6).await.unwrap();
    assert_eq!(&tail.data[..], b"uvwxyz");
    assert_eq!((tail.chunk_start, tail.chunk_end, tail.file_size), (20, 25, 26));

    let all = client.read_file_suffix("one", "dir/abc.txt", 100).await.unwrap();
    assert!(all.is_complete());
    assert_eq!(&all.data[..], ALPHABET);

    let none = client.read_file_suffix("one", "dir/abc.txt", 0).await.unwrap();
    assert_eq!((none.bytes_read, none.chunk_start, none.file_size), (0, 26, 26));

    let written = client
        .write_file_chunk(
            "one",
            "dir/abc.txt",
            Bytes::from_static(b"XYZ"),
            ChunkOptions::new(0, None),
            None,
        )
        .await
        .unwrap();
    assert_eq!(written.bytes_written, 3);

    client
        .append("one", "log.json", Bytes::from_static(b"{}"), Some("application/json"))
        .await
        .unwrap();
    assert_eq!(std::fs::read(chain.tmp.path().join("one/log.json")).unwrap(), b"{}");

    let file = client.read_file("one", "dir/abc.txt").await.unwrap();
    assert_eq!(&file.data[..6], b"XYZdef");
    assert!(file.last_modified.is_some());

    client
        .copy("one", "dir/abc.txt", "two", "copy.txt", CopyOptions::default())
        .await
        .unwrap();
    client.rename("two", "copy.txt", "renamed.txt").await.unwrap();
    let listing = client.read_dir("two", "").await.unwrap();
    assert_eq!(listing.files.len(), 1);
    assert_eq!(listing.files[0].filename, "renamed.txt");

    let err = client.stats("one", "ghost.txt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "File not found: ghost.txt");
}

#[tokio::test]
async fn test_peer_location_reads_through_front() {
    let chain = chain().await;
    std::fs::write(chain.tmp.path().join("one/abc.txt"), ALPHABET).unwrap();

    let response = chain
        .front
        .clone()
        .oneshot(ranged("GET", "/api/remote/abc.txt", "bytes=5-10", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()["content-range"], "bytes 5-10/26");
    assert_eq!(&body_bytes(response).await[..], b"fghijk");

    let response = chain
        .front
        .clone()
        .oneshot(ranged("GET", "/api/remote/abc.txt", "bytes=-6", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.headers()["content-range"], "bytes 20-25/26");
    assert_eq!(&body_bytes(response).await[..], b"uvwxyz");

    let response = chain
        .front
        .clone()
        .oneshot(ranged("GET", "/api/remote/abc.txt", "bytes=40-", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.headers()["content-range"], "bytes */26");

    let response = chain
        .front
        .clone()
        .oneshot(request("GET", "/api/remote?readDir", Body::empty()))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["dirInfo"]["files"][0]["fullpath"], "abc.txt");

    let response = chain
        .front
        .clone()
        .oneshot(request("GET", "/api/remote/abc.txt", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(&body_bytes(response).await[..], ALPHABET);
}

#[tokio::test]
async fn test_peer_location_writes_through_front() {
    let chain = chain().await;
    let send = |method: &str, uri: &str, body: &'static str| {
        chain.front.clone().oneshot(request(method, uri, body))
    };

    send("PUT", "/api/remote/notes/a.txt", "hello").await.unwrap();
    send("PATCH", "/api/remote/notes/a.txt?append", " world").await.unwrap();
    assert_eq!(
        std::fs::read(chain.tmp.path().join("one/notes/a.txt")).unwrap(),
        b"hello world"
    );

    let response = chain
        .front
        .clone()
        .oneshot(ranged("PATCH", "/api/remote/notes/a.txt", "bytes=0-4", "HELLO"))
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await,
        json!({ "update": "writeFileChunk", "done": true, "bytesWritten": 5 })
    );

    // Both peers point at the same instance, which performs the move itself.
    let response = send("PUT", "/api/remote2/moved.txt?moveFrom=remote/notes/a.txt", "")
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!({ "update": "move", "done": true }));
    assert_eq!(
        std::fs::read(chain.tmp.path().join("two/moved.txt")).unwrap(),
        b"HELLO world"
    );

    send("PUT", "/api/remote/deep/er?ensureDir", "").await.unwrap();
    send("DELETE", "/api/remote/deep?emptyDir", "").await.unwrap();
    assert!(chain.tmp.path().join("one/deep").is_dir());
    assert!(!chain.tmp.path().join("one/deep/er").exists());
    send("DELETE", "/api/remote/deep", "").await.unwrap();
    assert!(!chain.tmp.path().join("one/deep").exists());
}

#[tokio::test]
async fn test_remote_errors_keep_their_kind() {
    let chain = chain().await;

    let response = chain
        .front
        .clone()
        .oneshot(request("GET", "/api/remote/ghost.txt?stats", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({
            "error": "NotFound",
            "message": "File not found: ghost.txt",
            "url": "/api/remote/ghost.txt?stats",
        })
    );

    // Filesystem and peer locations never exchange data.
    std::fs::write(chain.tmp.path().join("local/x.txt"), b"x").unwrap();
    let response = chain
        .front
        .clone()
        .oneshot(request("PUT", "/api/remote/x.txt?copyFrom=local/x.txt", Body::empty()))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["error"], "InvalidRequest");
    assert!(!chain.tmp.path().join("one/x.txt").exists());
}

#[tokio::test]
async fn test_chunk_past_end_agrees_across_backends() {
    let chain = chain().await;
    std::fs::write(chain.tmp.path().join("one/abc.txt"), b"abc").unwrap();
    let local = fs_location(&chain.tmp, "one");
    let remote = Location::peer("remote", "Remote One", chain.back_origin.as_str(), "one");
    let fs_adapter = FilesystemAdapter::new();
    let peer_adapter = PeerAdapter::new();

    for options in [ChunkOptions::new(10, Some(2)), ChunkOptions::new(3, None), ChunkOptions::new(5, Some(0))] {
        let fs_err = fs_adapter
            .read_file_chunk(&local, "abc.txt", options)
            .await
            .unwrap_err();
        let peer_err = peer_adapter
            .read_file_chunk(&remote, "abc.txt", options)
            .await
            .unwrap_err();
        assert!(matches!(fs_err, AppError::RangeNotSatisfiable { file_size: 3 }), "{options:?}");
        assert!(matches!(peer_err, AppError::RangeNotSatisfiable { file_size: 3 }), "{options:?}");
    }

    let fs_tail = fs_adapter
        .read_file_chunk(&local, "abc.txt", ChunkOptions::new(1, Some(10)))
        .await
        .unwrap();
    let peer_tail = peer_adapter
        .read_file_chunk(&remote, "abc.txt", ChunkOptions::new(1, Some(10)))
        .await
        .unwrap();
    assert_eq!(&fs_tail.data[..], b"bc");
    assert_eq!(&peer_tail.data[..], b"bc");
    assert_eq!(
        (peer_tail.chunk_start, peer_tail.chunk_end, peer_tail.file_size),
        (fs_tail.chunk_start, fs_tail.chunk_end, fs_tail.file_size)
    );
}

#[tokio::test]
async fn test_unreachable_peer() {
    let tmp = tempfile::tempdir().unwrap();
    let peer = PeerLocation {
        id: "gone".to_string(),
        name: "Gone".to_string(),
        origin: "http://127.0.0.1:1".to_string(),
        route_prefix: Some("/api/".to_string()),
        remote_id: "one".to_string(),
    };
    let gone = Location::Peer(peer);

    // An absent path is `false`, an absent peer is an error.
    let err = PeerAdapter::new().exists(&gone, "x.txt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnderlyingIo);

    let front = app(config(vec![gone, fs_location(&tmp, "local")]));

    let response = front
        .oneshot(request("GET", "/api/gone/x.txt?stats", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "UnderlyingIOError");
}
