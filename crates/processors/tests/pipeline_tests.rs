mod support;

use futures::channel::mpsc;
use snatcher_core::{FetchConfig, Reply, ReplyUnit, RetryPolicy, SessionConfig};
use snatcher_engine::{AcquisitionEngine, ItemProcessor, ResponderSession};
use snatcher_fetch::ContentFetcher;
use snatcher_processors::catalog::parse_catalog;
use snatcher_processors::{
    inspect, plan_downloads, scan_bundles, scan_maps, JdNextDownloader, ServerVideoUpgrader,
    Sidecar, UbiArtVideoUpgrader,
};
use snatcher_responder::{Script, ScriptedResponder, SentLog};
use std::fs;
use std::path::Path;
use std::time::Duration;
use support::{start_cdn, Cdn};

fn session(script: Vec<Script>) -> (ResponderSession, SentLog) {
    let responder = ScriptedResponder::new(script);
    let sent = responder.sent();
    let config = SessionConfig {
        poll_interval: Duration::from_millis(5),
        poll_attempts: 3,
        settle: Duration::ZERO,
    };
    (ResponderSession::new(Box::new(responder), config), sent)
}

fn fetcher() -> ContentFetcher {
    ContentFetcher::new(FetchConfig {
        max_retries: 1,
        backoff: Duration::from_millis(1),
        ..FetchConfig::default()
    })
}

fn link(base: &str, name: &str) -> String {
    format!("[Link]({}/cdn/{})", base, name)
}

fn file_count(dir: &Path) -> usize {
    fs::read_dir(dir).map(|d| d.flatten().count()).unwrap_or_default()
}

fn assets_reply(base: &str, map: &str, with_package: bool) -> Reply {
    let f = |kind: &str| link(base, &format!("{}_{}", map, kind));
    let mut content = ReplyUnit::titled("Content")
        .with_field("Audio:", f("audio.ogg"))
        .with_field("Ultra HD:", f("ultra_hd.webm"))
        .with_field("High VP9:", f("high_vp9.webm"))
        .with_field("Low VP9:", "[Link](undefined)");
    if with_package {
        content = content.with_field("mapPackage:", f("package.zip"));
    }
    Reply::new(vec![
        ReplyUnit::titled("Images")
            .with_field("Cover:", f("cover.png"))
            .with_field("coachesLarge:", f("coaches_large.png"))
            .with_field("coachesSmall:", f("coaches_small.png")),
        ReplyUnit::titled("Previews").with_field("HIGH.vp9.webm:", f("ignored.webm")),
        content,
    ])
}

fn catalog_json(base: &str) -> String {
    let entry = |map: &str| {
        format!(
            r#"{{
                "parentMapName": "{map}",
                "title": "{map} title",
                "tags": ["Main"],
                "hasSongTitleInCover": false,
                "assets": {{
                    "audioPreview.opus": "{base}/cdn/{map}_preview.opus",
                    "videoPreview_ULTRA.vp9.webm": "{base}/cdn/{map}_preview_ultra.webm"
                }}
            }}"#,
            map = map,
            base = base
        )
    };
    format!(r#"{{"id-a": {}, "id-b": {}}}"#, entry("ItemA"), entry("ItemB"))
}

fn cdn_for(maps: &[&str]) -> Cdn {
    let kinds = [
        "audio.ogg",
        "ultra_hd.webm",
        "high_vp9.webm",
        "package.zip",
        "cover.png",
        "coaches_large.png",
        "coaches_small.png",
        "preview.opus",
        "preview_ultra.webm",
    ];
    let names: Vec<String> = maps
        .iter()
        .flat_map(|m| kinds.iter().map(move |k| format!("{}_{}", m, k)))
        .collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    Cdn::with_files(&refs)
}

#[async_std::test]
async fn test_jdnext_download_writes_layout_and_sidecar() {
    let cdn = cdn_for(&["ItemA", "ItemB"]);
    let base = start_cdn(cdn.clone()).await;
    let output = tempfile::tempdir().unwrap();

    let catalog = parse_catalog(&catalog_json(&base)).unwrap();
    let plan = plan_downloads(catalog, output.path()).unwrap();
    assert_eq!(plan.queue.count(), 2);

    let processor = JdNextDownloader::new(fetcher(), output.path(), plan.bundle_tags);
    let policy = processor.default_policy();
    let (session, sent) = session(vec![
        Script::Reply(assets_reply(&base, "ItemA", true)),
        Script::Reply(assets_reply(&base, "ItemB", true)),
    ]);
    let mut engine = AcquisitionEngine::new(processor, plan.queue, session, policy);
    let (_input_tx, mut input_rx) = mpsc::channel(4);
    let (mut output_tx, _output_rx) = mpsc::channel(64);

    engine.cycle(&mut input_rx, &mut output_tx).await;
    assert_eq!(engine.queue().count(), 1);
    assert_eq!(engine.queue().peek().unwrap().to_string(), "ItemB");
    assert_eq!(engine.failures(), 0);

    let map = output.path().join("ItemA");
    for folder in [
        "AudioPreview_opus",
        "videoPreview",
        "Cover",
        "CoachesLarge",
        "CoachesSmall",
        "Audio_opus",
        "MapPackage",
    ] {
        assert_eq!(file_count(&map.join(folder)), 1, "{}", folder);
    }
    assert!(map.join("videoPreview").join("ULTRA.webm").exists());
    assert!(map.join("video").join("ULTRA.webm").exists());
    assert!(map.join("video").join("HIGH.webm").exists());
    assert!(!map.join("video").join("LOW.webm").exists());
    assert_eq!(
        fs::read(map.join("video").join("ULTRA.webm")).unwrap(),
        b"content of ItemA_ultra_hd.webm"
    );

    match inspect(&map) {
        Sidecar::Valid(entry) => {
            assert_eq!(entry.song_id, "id-a");
            assert_eq!(entry.extra["title"], "ItemA title");
        }
        other => panic!("unexpected sidecar {:?}", other),
    }

    engine.cycle(&mut input_rx, &mut output_tx).await;
    assert!(engine.queue().is_empty());
    assert_eq!(sent.len(), 2);

    // a second run finds both maps complete
    let catalog = parse_catalog(&catalog_json(&base)).unwrap();
    let rerun = plan_downloads(catalog, output.path()).unwrap();
    assert!(rerun.queue.is_empty());
    assert_eq!(rerun.up_to_date, 2);
}

#[async_std::test]
async fn test_jdnext_missing_package_is_retried_then_dropped() {
    let cdn = cdn_for(&["ItemA"]);
    let base = start_cdn(cdn.clone()).await;
    let output = tempfile::tempdir().unwrap();

    let mut catalog = parse_catalog(&catalog_json(&base)).unwrap();
    catalog.remove("id-b");
    let plan = plan_downloads(catalog, output.path()).unwrap();
    assert_eq!(plan.queue.count(), 1);

    let processor = JdNextDownloader::new(fetcher(), output.path(), plan.bundle_tags);
    let (session, sent) = session(vec![
        Script::Reply(assets_reply(&base, "ItemA", false)),
        Script::Reply(assets_reply(&base, "ItemA", false)),
        Script::Reply(assets_reply(&base, "ItemA", false)),
    ]);
    let engine = AcquisitionEngine::new(processor, plan.queue, session, RetryPolicy::default());
    let (_input_tx, input_rx) = mpsc::channel(4);
    let (output_tx, _output_rx) = mpsc::channel(64);

    let summary = engine.run(input_rx, output_tx).await;
    assert_eq!(summary.dropped, 1);
    assert_eq!(sent.len(), 3);
    // nothing is downloaded without every required URL
    assert_eq!(cdn.total_hits(), 0);
    assert!(!output.path().join("ItemA").join("SongInfo.json").exists());
}

#[async_std::test]
async fn test_server_upgrade_two_steps() {
    let cdn = Cdn::with_files(&[
        "p_low.webm",
        "p_mid.webm",
        "p_high.webm",
        "p_ultra.webm",
        "p_audio.ogg",
        "uhd.webm",
        "hhd.webm",
        "mhd.webm",
        "lhd.webm",
    ]);
    let base = start_cdn(cdn.clone()).await;
    let maps = tempfile::tempdir().unwrap();

    let map = maps.path().join("old_koi");
    fs::create_dir_all(map.join("video")).unwrap();
    fs::create_dir_all(map.join("videoPreview")).unwrap();
    fs::write(map.join("video").join("UNKNOWN.webm"), b"old").unwrap();
    fs::write(map.join("videoPreview").join("LOW.webm"), b"old").unwrap();
    fs::write(
        map.join("SongInfo.json"),
        r#"{"parentMapName":"Koi","tags":["Main"]}"#,
    )
    .unwrap();

    let queue = scan_maps(maps.path()).unwrap();
    assert_eq!(queue.count(), 1);
    let koi = maps.path().join("Koi");
    assert!(koi.is_dir());

    let preview = Reply::new(vec![
        ReplyUnit::titled("Images"),
        ReplyUnit::titled("Previews")
            .with_field("Audio:", link(&base, "p_audio.ogg"))
            .with_field("LOW (vp9)", link(&base, "p_low.webm"))
            .with_field("MID (vp9)", link(&base, "p_mid.webm"))
            .with_field("HIGH (vp9)", link(&base, "p_high.webm"))
            .with_field("ULTRA (vp9)", link(&base, "p_ultra.webm")),
        ReplyUnit::titled("Content"),
    ]);
    let main = Reply::new(vec![ReplyUnit::titled("No HUD")
        .with_field("Ultra HD:", link(&base, "uhd.webm"))
        .with_field("High HD:", link(&base, "hhd.webm"))
        .with_field("Mid HD:", link(&base, "mhd.webm"))
        .with_field("Low HD:", link(&base, "lhd.webm"))]);
    let (session, sent) = session(vec![Script::Reply(preview), Script::Reply(main)]);

    let engine = AcquisitionEngine::new(
        ServerVideoUpgrader::new(fetcher()),
        queue,
        session,
        RetryPolicy::default(),
    );
    let (_input_tx, input_rx) = mpsc::channel(4);
    let (output_tx, _output_rx) = mpsc::channel(64);
    let summary = engine.run(input_rx, output_tx).await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(
        sent.commands(),
        vec!["/assets server:jdu codename:Koi", "/nohud codename:Koi"]
    );
    assert!(!koi.join("video").join("UNKNOWN.webm").exists());
    assert!(!koi.join("videoPreview").join("LOW.webm").exists());
    assert_eq!(file_count(&koi.join("video")), 4);
    assert_eq!(file_count(&koi.join("videoPreview")), 4);
    assert_eq!(file_count(&koi.join("AudioPreview_opus")), 1);
}

#[async_std::test]
async fn test_ubiart_replacement_takes_original_name() {
    let cdn = Cdn::with_files(&["koi_uhd.webm"]);
    let base = start_cdn(cdn.clone()).await;
    let bundles = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();

    let map_dir = bundles.path().join("bundle_pc/cache/itf_cooked/pc/world/maps/koi");
    fs::create_dir_all(map_dir.join("videoscoach")).unwrap();
    fs::write(
        map_dir.join("songdesc.tpl.ckd"),
        "{\"COMPONENTS\":[{\"MapName\":\"koi\"}]}\0",
    )
    .unwrap();
    fs::write(map_dir.join("videoscoach").join("koi.webm"), b"sd video").unwrap();

    let plan = scan_bundles(bundles.path(), cache.path()).unwrap();
    assert_eq!(plan.queue.count(), 1);

    let reply = Reply::new(vec![ReplyUnit::titled("No HUD")
        .with_field("Ultra HD:", link(&base, "koi_uhd.webm"))
        .with_field("Ultra:", link(&base, "missing.webm"))]);
    let (session, _sent) = session(vec![Script::Reply(reply)]);
    let engine = AcquisitionEngine::new(
        UbiArtVideoUpgrader::new(fetcher(), cache.path(), plan.videos),
        plan.queue,
        session,
        RetryPolicy::default(),
    );
    let (_input_tx, input_rx) = mpsc::channel(4);
    let (output_tx, _output_rx) = mpsc::channel(64);
    let summary = engine.run(input_rx, output_tx).await;

    assert_eq!(summary.succeeded, 1);
    let videos = cache.path().join("koi").join("videoscoach");
    assert_eq!(file_count(&videos), 1);
    assert_eq!(
        fs::read(videos.join("koi.webm")).unwrap(),
        b"content of koi_uhd.webm"
    );
}
