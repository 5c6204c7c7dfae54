//! End-to-end acquisition against a mocked slskd daemon.

use serde_json::json;
use slskd_acquire::{AcquireError, Downloader, Slskd, SlskdConfig, Track};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config with every delay shrunk to milliseconds
fn fast_config(uri: &str) -> SlskdConfig {
    let mut cfg = SlskdConfig::new(uri);
    cfg.retry = 3;
    cfg.timings.search_retry_delay = Duration::from_millis(10);
    cfg.timings.poll_interval = Duration::from_millis(20);
    cfg.timings.stale_after = Duration::from_millis(200);
    cfg.timings.delete_pause = Duration::from_millis(1);
    cfg
}

fn song_track() -> Track {
    Track {
        album: "Record".to_string(),
        duration: 200_000,
        ..Track::new("Song", "Band")
    }
}

async fn mount_completed_search(server: &MockServer, file_count: u32) {
    Mock::given(method("POST"))
        .and(path("/api/v0/searches"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s1", "isComplete": false, "searchText": "Song - Band"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v0/searches/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s1", "isComplete": true, "fileCount": file_count, "lockedFileCount": 0,
            "state": "Completed, ResponseLimitReached"
        })))
        .mount(server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v0/searches/s1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

async fn mount_responses(server: &MockServer, responses: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v0/searches/s1/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(responses))
        .mount(server)
        .await;
}

async fn mount_transfer_deletes(server: &MockServer, user: &str, id: &str) {
    for remove in ["false", "true"] {
        Mock::given(method("DELETE"))
            .and(path(format!("/api/v0/transfers/downloads/{user}/{id}")))
            .and(query_param("remove", remove))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_track_is_searched_queued_and_downloaded() {
    let server = MockServer::start().await;
    mount_completed_search(&server, 1).await;
    mount_responses(
        &server,
        json!([{
            "username": "user1",
            "fileCount": 1,
            "hasFreeUploadSlot": true,
            "files": [{
                "filename": "Music\\Band\\Band - Song.flac",
                "extension": "flac",
                "size": 31000000,
                "length": 205,
                "bitRate": 900,
                "bitDepth": 24
            }]
        }]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/v0/transfers/downloads/user1"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v0/transfers/downloads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "username": "user1",
            "directories": [{
                "directory": "Music\\Band",
                "fileCount": 1,
                "files": [{
                    "id": "t1",
                    "username": "user1",
                    "filename": "Music\\Band\\Band - Song.flac",
                    "size": 31000000,
                    "state": "InProgress",
                    "bytesTransferred": 31000000,
                    "bytesRemaining": 0,
                    "percentComplete": 100.0
                }]
            }]
        }])))
        .mount(&server)
        .await;
    mount_transfer_deletes(&server, "user1", "t1").await;

    let slskd_dir = TempDir::new().unwrap();
    let download_dir = TempDir::new().unwrap();
    std::fs::create_dir_all(slskd_dir.path().join("Band")).unwrap();
    std::fs::write(slskd_dir.path().join("Band").join("Band - Song.flac"), b"flac").unwrap();

    let mut cfg = fast_config(&server.uri());
    cfg.migrate_downloads = true;
    cfg.slskd_dir = slskd_dir.path().to_path_buf();
    let downloader = Downloader::from_slskd(Slskd::new(cfg, download_dir.path()));

    let mut tracks = vec![song_track()];
    let report = downloader.start_download(&mut tracks);

    assert_eq!(report.queued, 1);
    assert_eq!(report.downloaded, 1);
    assert_eq!(tracks.len(), 1);
    assert!(tracks[0].present);
    assert_eq!(tracks[0].owner.as_deref(), Some("user1"));
    assert_eq!(tracks[0].file.as_deref(), Some("Band - Song.flac"));
    assert_eq!(tracks[0].size, 31000000);
    assert!(download_dir.path().join("Band").join("Band - Song.flac").exists());
    assert!(!slskd_dir.path().join("Band").join("Band - Song.flac").exists());
}

#[tokio::test]
async fn test_empty_search_never_downloads() {
    let server = MockServer::start().await;
    mount_completed_search(&server, 0).await;
    Mock::given(method("POST"))
        .and(path("/api/v0/transfers/downloads/user1"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let slskd = Slskd::new(fast_config(&server.uri()), "/tmp");
    let mut track = song_track();
    let err = slskd.query_track(&mut track).unwrap_err();

    assert!(matches!(err, AcquireError::NoResults(_)));
    assert!(track.search_id.is_none());
    assert!(track.owner.is_none());
}

#[tokio::test]
async fn test_second_candidate_used_when_first_rejected() {
    let server = MockServer::start().await;
    mount_completed_search(&server, 2).await;
    mount_responses(
        &server,
        json!([
            {
                "username": "alice",
                "fileCount": 1,
                "hasFreeUploadSlot": true,
                "files": [{"filename": "a\\Band - Song.flac", "extension": "flac", "size": 10, "length": 200}]
            },
            {
                "username": "bob",
                "fileCount": 1,
                "hasFreeUploadSlot": true,
                "files": [{"filename": "b\\Band - Song.flac", "extension": "flac", "size": 20, "length": 199}]
            }
        ]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/v0/transfers/downloads/alice"))
        .respond_with(ResponseTemplate::new(500).set_body_string("peer offline"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v0/transfers/downloads/bob"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let slskd = Slskd::new(fast_config(&server.uri()), "/tmp");
    let mut track = song_track();
    slskd.query_track(&mut track).unwrap();
    slskd.get_track(&mut track).unwrap();

    assert_eq!(track.search_id.as_deref(), Some("s1"));
    assert_eq!(track.owner.as_deref(), Some("bob"));
    assert_eq!(track.file.as_deref(), Some("b\\Band - Song.flac"));
    assert_eq!(track.size, 20);
}

#[tokio::test]
async fn test_no_candidates_deletes_search() {
    let server = MockServer::start().await;
    mount_completed_search(&server, 1).await;
    mount_responses(
        &server,
        json!([{
            "username": "alice",
            "fileCount": 1,
            "hasFreeUploadSlot": true,
            "files": [{"filename": "Unrelated - Tune.flac", "extension": "flac", "size": 10, "length": 200}]
        }]),
    )
    .await;

    let slskd = Slskd::new(fast_config(&server.uri()), "/tmp");
    let mut track = song_track();
    slskd.query_track(&mut track).unwrap();
    let err = slskd.get_track(&mut track).unwrap_err();

    assert!(matches!(err, AcquireError::NoCandidates(_)));
    let deletes = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "DELETE" && r.url.path() == "/api/v0/searches/s1")
        .count();
    assert_eq!(deletes, 1);
}

#[tokio::test]
async fn test_monitor_skips_errored_and_recovers_from_failed_poll() {
    let server = MockServer::start().await;

    // First poll fails; the monitor must keep going
    Mock::given(method("GET"))
        .and(path("/api/v0/transfers/downloads"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v0/transfers/downloads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "username": "u",
            "directories": [{
                "directory": "x",
                "files": [
                    {"id": "t1", "filename": "x\\good.flac", "state": "Completed, Succeeded",
                     "bytesTransferred": 5, "bytesRemaining": 0, "percentComplete": 100.0},
                    {"id": "t2", "filename": "x\\bad.flac", "state": "Completed, Errored",
                     "bytesTransferred": 1, "bytesRemaining": 4, "percentComplete": 20.0}
                ]
            }]
        }])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let queued = |file: &str, search: &str| Track {
        search_id: Some(search.to_string()),
        owner: Some("u".to_string()),
        file: Some(file.to_string()),
        size: 5,
        ..Track::new(file, "u")
    };
    let mut tracks = vec![queued("x\\good.flac", "s1"), queued("x\\bad.flac", "s2")];

    let slskd = Slskd::new(fast_config(&server.uri()), "/tmp");
    let downloaded = slskd.monitor_downloads(&mut tracks);

    assert_eq!(downloaded, 1);
    assert!(tracks[0].present);
    assert_eq!(tracks[0].file.as_deref(), Some("good.flac"));
    assert!(!tracks[1].present);

    let requests = server.received_requests().await.unwrap();
    let polls = requests
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .count();
    assert!(polls >= 2);
    for id in ["t1", "t2"] {
        for remove in ["false", "true"] {
            assert!(requests.iter().any(|r| {
                r.method.as_str() == "DELETE"
                    && r.url.path() == format!("/api/v0/transfers/downloads/u/{id}")
                    && r.url.query() == Some(format!("remove={remove}").as_str())
            }));
        }
    }
}

#[tokio::test]
async fn test_monitor_abandons_stalled_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v0/transfers/downloads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "username": "u",
            "directories": [{
                "directory": "x",
                "files": [{"id": "t9", "filename": "slow.flac", "state": "InProgress",
                           "bytesTransferred": 3, "bytesRemaining": 97, "percentComplete": 3.0}]
            }]
        }])))
        .mount(&server)
        .await;
    mount_transfer_deletes(&server, "u", "t9").await;

    let mut tracks = vec![Track {
        owner: Some("u".to_string()),
        file: Some("slow.flac".to_string()),
        ..Track::new("Slow", "u")
    }];

    let slskd = Slskd::new(fast_config(&server.uri()), "/tmp");
    let downloaded = slskd.monitor_downloads(&mut tracks);

    assert_eq!(downloaded, 0);
    assert!(!tracks[0].present);
}

#[tokio::test]
async fn test_monitor_deadline_stops_batch() {
    let server = MockServer::start().await;
    // Bytes never move but the staleness window is far away
    Mock::given(method("GET"))
        .and(path("/api/v0/transfers/downloads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "username": "u",
            "directories": [{
                "directory": "x",
                "files": [{"id": "t3", "filename": "q.flac", "state": "Queued, Remotely",
                           "bytesTransferred": 0, "bytesRemaining": 100, "percentComplete": 0.0}]
            }]
        }])))
        .mount(&server)
        .await;
    mount_transfer_deletes(&server, "u", "t3").await;

    let mut cfg = fast_config(&server.uri());
    cfg.timings.stale_after = Duration::from_secs(3600);
    cfg.monitor_deadline = Some(Duration::from_millis(100));

    let mut tracks = vec![Track {
        owner: Some("u".to_string()),
        file: Some("q.flac".to_string()),
        ..Track::new("Queued", "u")
    }];

    let downloaded = Slskd::new(cfg, "/tmp").monitor_downloads(&mut tracks);
    assert_eq!(downloaded, 0);
    assert!(!tracks[0].present);
}
