use std::sync::Arc;

use super::{DeviceEvent, SourceEvent, TransportController, TransportState};
use crate::error::{DeviceError, PlaybackError};
use crate::history::HistoryRecorder;
use crate::library::Track;
use crate::queue::QueueManager;
use crate::testing::{FakeDevice, FakeDeviceHandle, FakeSink, fake_device, silent_track, track};

fn controller() -> (TransportController<FakeDevice>, FakeDeviceHandle, Arc<FakeSink>) {
    let (device, handle) = fake_device();
    let sink = Arc::new(FakeSink::default());
    let mut c = TransportController::new(device, HistoryRecorder::new(sink.clone()), 1.0, false);
    c.set_user(Some("u1".to_string()));
    (c, handle, sink)
}

fn play_now(c: &mut TransportController<FakeDevice>, t: Track) {
    let req = c.start(t).unwrap();
    c.settle(req.generation(), Ok(())).unwrap();
}

fn queue_at(ids: &[&str], start: &str) -> QueueManager {
    let mut q = QueueManager::new();
    q.load(ids.iter().map(|id| track(id)).collect(), Some(start));
    q
}

fn history_ids(sink: &FakeSink) -> Vec<String> {
    sink.writes().into_iter().map(|(_, t)| t).collect()
}

#[test]
fn new_applies_clamped_volume_and_mute_to_device() {
    let (device, handle) = fake_device();
    let c = TransportController::new(device, HistoryRecorder::disabled(), 3.0, true);
    assert_eq!(c.volume(), 1.0);
    assert!(c.muted());
    assert_eq!(handle.log().volume, Some(1.0));
    assert_eq!(handle.log().muted, Some(true));
    assert_eq!(c.state(), TransportState::Idle);
}

#[test]
fn start_without_locator_is_rejected_and_state_unchanged() {
    let (mut c, handle, _) = controller();

    let err = c.start(silent_track("x")).unwrap_err();
    assert_eq!(
        err,
        PlaybackError::InvalidTrack {
            track_id: "x".to_string()
        }
    );
    assert_eq!(c.state(), TransportState::Idle);
    assert!(c.current_track().is_none());
    assert!(handle.log().sources.is_empty());

    play_now(&mut c, track("a"));
    let blank = Track::new("b", "B", "Artist").with_audio_url("   ");
    assert!(matches!(c.start(blank), Err(PlaybackError::InvalidTrack { .. })));
    assert_eq!(c.source_epoch(), 1);
    assert_eq!(c.state(), TransportState::Playing);
    assert_eq!(c.current_track().map(|t| t.id.as_str()), Some("a"));
}

#[test]
fn start_loads_source_and_moves_through_loading_to_playing() {
    let (mut c, mut handle, _) = controller();

    let req = c.start(track("a")).unwrap();
    assert_eq!(req.track_id(), "a");
    assert_eq!(c.state(), TransportState::Loading);
    assert_eq!(c.current_track().map(|t| t.id.as_str()), Some("a"));
    assert_eq!(handle.log().sources, vec!["file:///music/a.mp3".to_string()]);
    assert_eq!(
        handle.try_next_play().and_then(|p| p.source),
        Some("file:///music/a.mp3".to_string())
    );

    assert!(c.settle(req.generation(), Ok(())).is_ok());
    assert_eq!(c.state(), TransportState::Playing);
}

#[test]
fn track_change_resets_time_and_duration() {
    let (mut c, _handle, _) = controller();
    let mut q = queue_at(&["a", "b"], "a");

    play_now(&mut c, track("a"));
    c.handle_event(DeviceEvent::MetadataLoaded { duration: 180.0 }, &mut q);
    c.handle_event(DeviceEvent::TimeUpdate(42.0), &mut q);
    assert_eq!(c.current_time(), 42.0);
    assert_eq!(c.duration(), 180.0);

    c.start(track("b")).unwrap();
    assert_eq!(c.current_time(), 0.0);
    assert_eq!(c.duration(), 0.0);
}

#[test]
fn refused_start_falls_back_to_paused_and_can_be_retried() {
    let (mut c, _handle, sink) = controller();

    let req = c.start(track("a")).unwrap();
    let err = c
        .settle(req.generation(), Err(DeviceError::new("autoplay blocked")))
        .unwrap_err();
    assert_eq!(
        err,
        PlaybackError::StartFailed {
            track_id: "a".to_string(),
            reason: "autoplay blocked".to_string()
        }
    );
    assert_eq!(c.state(), TransportState::Paused);
    assert_eq!(c.current_track().map(|t| t.id.as_str()), Some("a"));
    assert!(sink.writes().is_empty());

    let retry = c.resume().expect("resume from paused");
    c.settle(retry.generation(), Ok(())).unwrap();
    assert_eq!(c.state(), TransportState::Playing);
    assert_eq!(history_ids(&sink), vec!["a".to_string()]);
}

#[test]
fn stale_start_outcome_is_discarded() {
    let (mut c, _handle, sink) = controller();

    let first = c.start(track("a")).unwrap();
    let second = c.start(track("b")).unwrap();
    assert!(second.generation() > first.generation());

    // The older request resolves first: nothing moves.
    assert_eq!(
        c.settle(first.generation(), Ok(())),
        Err(PlaybackError::Superseded)
    );
    assert_eq!(c.state(), TransportState::Loading);
    assert_eq!(c.current_track().map(|t| t.id.as_str()), Some("b"));

    c.settle(second.generation(), Ok(())).unwrap();
    assert_eq!(c.state(), TransportState::Playing);
    assert_eq!(history_ids(&sink), vec!["b".to_string()]);
}

#[test]
fn late_failure_of_superseded_start_does_not_pause_newer_track() {
    let (mut c, _handle, _) = controller();

    let first = c.start(track("a")).unwrap();
    let second = c.start(track("b")).unwrap();
    c.settle(second.generation(), Ok(())).unwrap();

    let late = c.settle(first.generation(), Err(DeviceError::new("aborted")));
    assert_eq!(late, Err(PlaybackError::Superseded));
    assert_eq!(c.state(), TransportState::Playing);
    assert_eq!(c.current_track().map(|t| t.id.as_str()), Some("b"));
}

#[test]
fn pause_twice_from_playing_is_idempotent() {
    let (mut c, handle, _) = controller();
    play_now(&mut c, track("a"));

    c.pause();
    assert_eq!(c.state(), TransportState::Paused);
    c.pause();
    assert_eq!(c.state(), TransportState::Paused);
    assert_eq!(handle.log().pauses, 1);
}

#[test]
fn pause_and_resume_are_no_ops_outside_their_states() {
    let (mut c, handle, _) = controller();
    c.pause();
    assert_eq!(c.state(), TransportState::Idle);
    assert!(c.resume().is_none());

    c.start(track("a")).unwrap();
    c.pause();
    assert_eq!(c.state(), TransportState::Loading);
    assert!(c.resume().is_none());
    assert_eq!(handle.log().pauses, 0);
}

#[test]
fn toggle_dispatches_on_state() {
    let (mut c, _handle, _) = controller();
    assert!(c.toggle_play_pause().is_none());

    play_now(&mut c, track("a"));
    assert!(c.toggle_play_pause().is_none());
    assert_eq!(c.state(), TransportState::Paused);

    let req = c.toggle_play_pause().expect("resume request");
    // State only changes once the device confirms.
    assert_eq!(c.state(), TransportState::Paused);
    c.settle(req.generation(), Ok(())).unwrap();
    assert_eq!(c.state(), TransportState::Playing);
}

#[test]
fn seek_is_clamped_to_known_duration() {
    let (mut c, handle, _) = controller();
    let mut q = queue_at(&["a"], "a");
    play_now(&mut c, track("a"));
    c.handle_event(DeviceEvent::MetadataLoaded { duration: 200.0 }, &mut q);

    for (input, expected) in [(-5.0, 0.0), (500.0, 200.0), (42.5, 42.5), (200.0, 200.0)] {
        c.seek(input);
        assert_eq!(c.current_time(), expected, "seek({input})");
        assert!((0.0..=c.duration()).contains(&c.current_time()));
    }
    assert_eq!(handle.log().seeks, vec![0.0, 200.0, 42.5, 200.0]);

    c.seek(f64::NAN);
    c.seek(f64::INFINITY);
    assert_eq!(c.current_time(), 200.0);
}

#[test]
fn seek_before_metadata_is_deferred_and_latest_request_wins() {
    let (mut c, handle, _) = controller();
    let mut q = queue_at(&["a"], "a");
    c.start(track("a")).unwrap();

    c.seek(10.0);
    c.seek(999.0);
    assert_eq!(c.current_time(), 0.0);
    assert!(handle.log().seeks.is_empty());

    c.handle_event(DeviceEvent::MetadataLoaded { duration: 120.0 }, &mut q);
    assert_eq!(c.current_time(), 120.0);
    assert_eq!(handle.log().seeks, vec![120.0]);
}

#[test]
fn seek_by_is_relative_to_current_position() {
    let (mut c, _handle, _) = controller();
    let mut q = queue_at(&["a"], "a");
    play_now(&mut c, track("a"));
    c.handle_event(DeviceEvent::MetadataLoaded { duration: 60.0 }, &mut q);
    c.handle_event(DeviceEvent::TimeUpdate(30.0), &mut q);

    c.seek_by(5.0);
    assert_eq!(c.current_time(), 35.0);
    c.seek_by(-100.0);
    assert_eq!(c.current_time(), 0.0);
}

#[test]
fn seek_is_ignored_without_a_loaded_track() {
    let (mut c, handle, _) = controller();
    c.seek(10.0);
    assert_eq!(c.current_time(), 0.0);
    assert!(handle.log().seeks.is_empty());
}

#[test]
fn volume_is_clamped_and_mute_is_independent() {
    let (mut c, handle, _) = controller();

    c.set_volume(1.4);
    assert_eq!(c.volume(), 1.0);
    c.set_volume(-0.2);
    assert_eq!(c.volume(), 0.0);
    assert_eq!(handle.log().volume, Some(0.0));

    c.set_volume(0.6);
    c.set_volume(f32::NAN);
    assert_eq!(c.volume(), 0.6);

    c.toggle_mute();
    assert!(c.muted());
    assert_eq!(c.volume(), 0.6);
    c.toggle_mute();
    assert!(!c.muted());
    assert_eq!(handle.log().muted, Some(false));
}

#[test]
fn ended_advances_to_next_track_and_records_it_once() {
    let (mut c, _handle, sink) = controller();
    let mut q = queue_at(&["t1", "t2", "t3"], "t1");

    play_now(&mut c, track("t1"));
    c.handle_event(DeviceEvent::MetadataLoaded { duration: 90.0 }, &mut q);
    c.handle_event(DeviceEvent::TimeUpdate(89.5), &mut q);

    let req = c
        .handle_event(DeviceEvent::Ended, &mut q)
        .expect("auto-advance starts the next track");
    assert_eq!(req.track_id(), "t2");
    assert_eq!(q.current_index(), Some(1));
    assert_eq!(c.current_time(), 0.0);
    assert_eq!(c.state(), TransportState::Loading);

    c.settle(req.generation(), Ok(())).unwrap();
    assert_eq!(c.state(), TransportState::Playing);
    let t2_writes = history_ids(&sink).iter().filter(|id| *id == "t2").count();
    assert_eq!(t2_writes, 1);
}

#[test]
fn ended_on_last_track_stops_in_ended_state() {
    let (mut c, handle, _) = controller();
    let mut q = queue_at(&["t1", "t2", "t3"], "t3");

    play_now(&mut c, track("t3"));
    let plays_before = handle.log().plays;

    assert!(c.handle_event(DeviceEvent::Ended, &mut q).is_none());
    assert_eq!(c.state(), TransportState::Ended);
    assert_eq!(q.current_index(), Some(2));
    assert_eq!(handle.log().plays, plays_before);
    assert_eq!(c.current_track().map(|t| t.id.as_str()), Some("t3"));
}

#[test]
fn auto_advance_skips_tracks_without_locator() {
    let (mut c, _handle, _) = controller();
    let mut q = QueueManager::new();
    q.load(vec![track("a"), silent_track("b"), track("c")], None);

    play_now(&mut c, track("a"));
    let req = c.handle_event(DeviceEvent::Ended, &mut q).unwrap();
    assert_eq!(req.track_id(), "c");
    assert_eq!(q.current_index(), Some(2));
}

#[test]
fn ended_is_ignored_unless_playing() {
    let (mut c, _handle, _) = controller();
    let mut q = queue_at(&["a", "b"], "a");

    play_now(&mut c, track("a"));
    c.pause();
    assert!(c.handle_event(DeviceEvent::Ended, &mut q).is_none());
    assert_eq!(c.state(), TransportState::Paused);
    assert_eq!(q.current_index(), Some(0));
}

#[test]
fn device_error_parks_transport_until_a_new_start() {
    let (mut c, handle, _) = controller();
    let mut q = queue_at(&["a", "b"], "a");

    play_now(&mut c, track("a"));
    c.handle_event(DeviceEvent::MetadataLoaded { duration: 100.0 }, &mut q);
    c.handle_event(DeviceEvent::Error("decoder crashed".to_string()), &mut q);
    assert_eq!(c.state(), TransportState::Error);
    assert_eq!(c.last_error(), Some("playback failed: decoder crashed"));

    c.pause();
    c.seek(20.0);
    c.handle_event(DeviceEvent::TimeUpdate(50.0), &mut q);
    assert!(c.resume().is_none());
    assert_eq!(c.state(), TransportState::Error);
    assert_eq!(handle.log().pauses, 0);
    assert!(handle.log().seeks.is_empty());

    play_now(&mut c, track("b"));
    assert_eq!(c.state(), TransportState::Playing);
    assert!(c.last_error().is_none());
}

#[test]
fn device_error_invalidates_in_flight_start() {
    let (mut c, _handle, _) = controller();
    let mut q = queue_at(&["a"], "a");

    let req = c.start(track("a")).unwrap();
    c.handle_event(DeviceEvent::Error("network".to_string()), &mut q);
    assert_eq!(
        c.settle(req.generation(), Ok(())),
        Err(PlaybackError::Superseded)
    );
    assert_eq!(c.state(), TransportState::Error);
}

#[test]
fn next_and_previous_stop_at_queue_edges() {
    let (mut c, _handle, _) = controller();
    let mut q = queue_at(&["a", "b"], "a");
    play_now(&mut c, track("a"));

    assert!(c.previous(&mut q).unwrap().is_none());
    assert_eq!(c.state(), TransportState::Playing);

    c.pause();
    let req = c.next(&mut q).unwrap().expect("next from paused");
    assert_eq!(req.track_id(), "b");
    c.settle(req.generation(), Ok(())).unwrap();

    assert!(c.next(&mut q).unwrap().is_none());
    assert_eq!(c.current_track().map(|t| t.id.as_str()), Some("b"));
    assert_eq!(q.current_index(), Some(1));
}

#[test]
fn anonymous_session_plays_without_history() {
    let (device, _handle) = fake_device();
    let sink = Arc::new(FakeSink::default());
    let mut c = TransportController::new(device, HistoryRecorder::new(sink.clone()), 1.0, false);

    play_now(&mut c, track("a"));
    assert_eq!(c.state(), TransportState::Playing);
    assert!(sink.writes().is_empty());
    assert!(c.take_side_effects().is_empty());
}

#[test]
fn resuming_same_track_does_not_duplicate_history() {
    let (mut c, _handle, sink) = controller();
    play_now(&mut c, track("a"));
    c.pause();
    let req = c.resume().unwrap();
    c.settle(req.generation(), Ok(())).unwrap();

    assert_eq!(history_ids(&sink), vec!["a".to_string()]);
    assert_eq!(c.take_side_effects().len(), 1);
    assert!(c.take_side_effects().is_empty());
}

#[test]
fn returning_to_a_track_after_a_refused_start_records_it_again() {
    let (mut c, _handle, sink) = controller();
    play_now(&mut c, track("a"));

    let req = c.start(track("b")).unwrap();
    c.settle(req.generation(), Err(DeviceError::new("blocked")))
        .unwrap_err();
    play_now(&mut c, track("a"));

    assert_eq!(history_ids(&sink), vec!["a".to_string(), "a".to_string()]);
}

#[test]
fn events_from_a_replaced_source_are_ignored() {
    let (mut c, handle, _) = controller();
    let mut q = queue_at(&["t1", "t2", "t3"], "t1");
    play_now(&mut c, track("t1"));
    assert_eq!(c.source_epoch(), 1);

    let req = c.next(&mut q).unwrap().unwrap();
    c.settle(req.generation(), Ok(())).unwrap();
    assert_eq!(c.source_epoch(), 2);
    let plays_before = handle.log().plays;

    let stale = SourceEvent::new(1, DeviceEvent::Ended);
    assert!(c.handle_source_event(stale, &mut q).is_none());
    assert_eq!(c.state(), TransportState::Playing);
    assert_eq!(q.current_index(), Some(1));
    assert_eq!(handle.log().plays, plays_before);

    let current = SourceEvent::new(2, DeviceEvent::TimeUpdate(4.0));
    assert!(c.handle_source_event(current, &mut q).is_none());
    assert_eq!(c.current_time(), 4.0);
}

#[test]
fn release_hands_device_back() {
    let (mut c, handle, _) = controller();
    let req = c.start(track("a")).unwrap();
    c.release();
    assert!(handle.log().released);
    assert_eq!(
        c.settle(req.generation(), Ok(())),
        Err(PlaybackError::Superseded)
    );
}
