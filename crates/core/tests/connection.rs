use arena_core::{Input, Room, RoomConfig};

fn held(up: bool, down: bool, left: bool, right: bool, seq: u32, angle: f32) -> Input {
    Input {
        seq,
        up,
        down,
        left,
        right,
        angle,
    }
}

#[test]
fn joined_player_appears_in_its_own_first_delta() {
    let mut room = Room::new(RoomConfig::default());
    room.join("a").unwrap();

    let outputs = room.advance(1.0 / 60.0).unwrap();
    let delta = &outputs[0].deltas["a"];
    assert_eq!(delta.players.len(), 1);
    assert_eq!(delta.players[0].session_id, "a");
    assert!(delta.players[0].full);
}

#[test]
fn reconnection_preserves_player_during_grace() {
    let mut room = Room::new(RoomConfig::default());
    room.join("a").unwrap();
    room.disconnect("a", false);

    room.advance(1.0).unwrap();
    assert_eq!(room.player_count(), 1, "player must survive within grace");

    room.reconnect("a").unwrap();
    room.push_input("a", held(false, false, false, true, 1, 0.0));
    room.advance(1.0 / 60.0).unwrap();
    assert_eq!(room.player_count(), 1);
}

#[test]
fn consented_leave_destroys_player_immediately() {
    let mut room = Room::new(RoomConfig::default());
    room.join("a").unwrap();
    room.disconnect("a", true);
    assert_eq!(room.player_count(), 0);
}

#[test]
fn room_refuses_joins_past_capacity() {
    let mut room = Room::new(RoomConfig {
        max_clients: 1,
        ..RoomConfig::default()
    });
    room.join("a").unwrap();
    assert!(room.join("b").is_err());
}

#[test]
fn last_processed_seq_is_monotonic_under_out_of_order_delivery() {
    let mut room = Room::new(RoomConfig::default());
    room.join("a").unwrap();

    room.push_input("a", held(true, false, false, false, 5, 0.0));
    room.advance(1.0 / 60.0).unwrap();
    let after_five = room.last_processed_seq("a").unwrap();

    room.push_input("a", held(true, false, false, false, 3, 0.0));
    room.advance(1.0 / 60.0).unwrap();
    let after_stale = room.last_processed_seq("a").unwrap();

    assert_eq!(after_five, 5);
    assert_eq!(after_stale, 5, "a stale seq must not move lastProcessedSeq backward");
}
