mod common;

use common::{ChannelScript, KeywordScorer, ScriptedHistory, group, member, temp_config};
use relmap::RelmapError;
use relmap::history::{ChannelId, MemberId};
use relmap::relations::{RelationService, ScopeRequest};
use relmap::render::PlotRenderer;
use std::sync::Arc;
use std::sync::atomic::Ordering;

fn community() -> (ScriptedHistory, Vec<relmap::history::Member>) {
    let (ana, ben, cy, dee) = (
        member(1, "Ana"),
        member(2, "Ben"),
        member(3, "Cy"),
        member(4, "Dee"),
    );

    let mut general = ChannelScript::new(100, 1);
    let q = general.say(&ana, "anyone around?");
    general.say(&ben, "yep");
    general.reply(&cy, q, "thanks for asking");
    general.say(&ana, "love this place");
    general.mention(&dee, &[ben.clone()], "ugh @ben");

    let mut random = ChannelScript::new(200, 50);
    random.say(&ben, "memes");
    random.say(&ana, "thanks ben");
    random.say(&ben, "love you too");
    random.say(&ana, "thanks again");

    let history = ScriptedHistory::new()
        .channel("general", general)
        .channel("random", random);
    (history, vec![ana, ben, cy, dee])
}

fn service(history: Arc<ScriptedHistory>) -> (RelationService, tempfile::TempDir) {
    let (config, dir) = temp_config();
    let service = RelationService::new(
        history,
        Arc::new(KeywordScorer::default()),
        Arc::new(PlotRenderer::new(&config.render)),
        &config,
        None,
    )
    .unwrap();
    (service, dir)
}

#[tokio::test]
async fn test_full_guild_scan() {
    let (history, members) = community();
    let history = Arc::new(history);
    let (service, _dir) = service(history.clone());
    let request = ScopeRequest::new(group(9, &members));

    let map = service.build_map(&request, false, None).await.unwrap();
    let matrix = map.matrix().unwrap();
    let cell = |a: u64, b: u64| *matrix.get(MemberId(a), MemberId(b)).unwrap();

    // general: ben->ana, cy->ana (reply), ana->cy, dee->ana + dee->ben
    // random:  ana->ben, ben->ana, ana->ben
    assert_eq!(cell(2, 1).count, 2);
    assert_eq!(cell(3, 1).count, 1);
    assert!((cell(3, 1).sum - 0.8).abs() < 1e-9);
    assert_eq!(cell(1, 3).count, 1);
    assert_eq!(cell(4, 1).count, 1);
    assert_eq!(cell(4, 2).count, 1);
    assert!((cell(4, 2).sum + 0.6).abs() < 1e-9);
    assert_eq!(cell(1, 2).count, 2);
    assert!((cell(1, 2).sum - 1.6).abs() < 1e-9);
    assert_eq!(history.fetch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_channel_scope() {
    let (history, members) = community();
    let (service, _dir) = service(Arc::new(history));
    let request = ScopeRequest::new(group(9, &members)).in_channel(ChannelId(200));

    let map = service.build_map(&request, false, None).await.unwrap();
    let matrix = map.matrix().unwrap();
    assert_eq!(matrix.total_count(), 3);
    assert_eq!(matrix.get(MemberId(3), MemberId(1)).unwrap().count, 0);
}

#[tokio::test]
async fn test_sub_group_ignores_outsiders() {
    let (history, members) = community();
    let (service, _dir) = service(Arc::new(history));
    let request = ScopeRequest::new(group(10, &members[..2]));

    let map = service.build_map(&request, false, None).await.unwrap();
    let matrix = map.matrix().unwrap();
    assert_eq!(matrix.len(), 2);
    assert!(!matrix.contains(MemberId(4)));
    // Cy's reply and Dee's mention no longer count
    assert_eq!(matrix.get(MemberId(2), MemberId(1)).unwrap().count, 2);
}

#[tokio::test]
async fn test_renders_real_svg_artifacts() {
    let (history, members) = community();
    let (service, dir) = service(Arc::new(history));
    let request = ScopeRequest::new(group(9, &members));

    let heatmap = service
        .matrix(&request, "logsum", Some("coolwarm"), None)
        .await
        .unwrap();
    let graph = service.graph(&request, None, None).await.unwrap();

    assert!(heatmap.starts_with(dir.path()));
    let heatmap_svg = std::fs::read_to_string(&heatmap).unwrap();
    assert!(heatmap_svg.contains("logsum"));
    let graph_svg = std::fs::read_to_string(&graph).unwrap();
    assert!(graph_svg.contains("Dee"));
    assert!(graph.to_string_lossy().ends_with("graph-min2.svg"));
}

#[tokio::test]
async fn test_bad_requests_do_no_work() {
    let (history, members) = community();
    let history = Arc::new(history);
    let (service, _dir) = service(history.clone());
    let request = ScopeRequest::new(group(9, &members));

    let err = service
        .matrix(&request, "mean", Some("jet"), None)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    let err = service
        .matrix(&request, "ratio", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, RelmapError::UnknownMetric { .. }));
    assert_eq!(history.list_calls.load(Ordering::SeqCst), 0);
}
