mod common;

use common::{id, Fixture};
use sinkchat::chat::format::strip_colors;
use sinkchat::chat::memory::{MemoryPlayer, MemoryTowns};
use sinkchat::chat::{Location, Town};
use sinkchat::config::Config;

const SPY: &str = "sinkchat.spy";
const SPY_ALL: &str = "sinkchat.spy.all";
const SPY_BYPASS: &str = "sinkchat.spy.bypass";

#[test]
fn range_is_inclusive_per_axis() {
    let fx = Fixture::new();
    let alice = fx.add(MemoryPlayer::new("alice").at(0.0, 64.0, 0.0));
    let edge = fx.add(MemoryPlayer::new("edge").at(50.0, 14.0, -50.0));
    let past_x = fx.add(MemoryPlayer::new("past_x").at(51.0, 64.0, 0.0));
    let past_y = fx.add(MemoryPlayer::new("past_y").at(0.0, 115.0, 0.0));

    assert!(fx.chat(&alice, "hi"));
    assert_eq!(strip_colors(&alice.inbox()[0]), "alice: hi");
    assert_eq!(strip_colors(&edge.inbox()[0]), "alice: hi");
    assert!(past_x.inbox().is_empty());
    assert!(past_y.inbox().is_empty());
}

#[test]
fn console_always_gets_spy_copy() {
    let fx = Fixture::new();
    let alice = fx.add(MemoryPlayer::new("alice"));
    fx.chat(&alice, "hello");
    assert_eq!(
        fx.directory.console_lines(),
        vec!["§7§7[Spy] §ralice§7:§r hello".to_string()]
    );
}

#[test]
fn spy_copy_needs_permission_and_flag() {
    let fx = Fixture::new();
    let alice = fx.add(MemoryPlayer::new("alice"));
    let spy = fx.add(MemoryPlayer::new("spy").at(1000.0, 0.0, 0.0).with_permissions(&[SPY]));
    let idle = fx.add(MemoryPlayer::new("idle").at(1000.0, 0.0, 0.0).with_permissions(&[SPY]));
    let nosy = fx.add(MemoryPlayer::new("nosy").at(1000.0, 0.0, 0.0));
    fx.store.set_spy_enabled(id(&spy), "spy", true);
    fx.store.set_spy_enabled(id(&nosy), "nosy", true);

    fx.chat(&alice, "psst");
    assert_eq!(strip_colors(&spy.inbox()[0]), "[Spy] alice: psst");
    assert!(idle.inbox().is_empty());
    assert!(nosy.inbox().is_empty());
    assert_eq!(fx.server.metrics().snapshot().spy_copies, 1);
}

#[test]
fn in_range_spy_gets_one_plain_copy() {
    let fx = Fixture::new();
    let alice = fx.add(MemoryPlayer::new("alice"));
    let spy = fx.add(MemoryPlayer::new("spy").at(5.0, 0.0, 5.0).with_permissions(&[SPY, SPY_ALL]));
    fx.store.set_spy_enabled(id(&spy), "spy", true);

    fx.chat(&alice, "near");
    assert_eq!(spy.inbox(), vec!["alice§7:§r near".to_string()]);
    assert_eq!(fx.server.metrics().snapshot().spy_copies, 0);
}

#[test]
fn bypass_hides_from_plain_spies_only() {
    let fx = Fixture::new();
    let admin = fx.add(MemoryPlayer::new("admin").with_permissions(&[SPY_BYPASS]));
    let spy = fx.add(MemoryPlayer::new("spy").at(-900.0, 0.0, 0.0).with_permissions(&[SPY]));
    let all = fx.add(MemoryPlayer::new("all").at(-900.0, 0.0, 0.0).with_permissions(&[SPY_ALL]));
    fx.store.set_spy_enabled(id(&spy), "spy", true);
    fx.store.set_spy_enabled(id(&all), "all", true);

    fx.chat(&admin, "secret");
    assert!(spy.inbox().is_empty());
    assert_eq!(strip_colors(&all.inbox()[0]), "[Spy] admin: secret");
    // the console is never bypassed
    assert_eq!(fx.directory.console_lines().len(), 1);
}

#[test]
fn moving_changes_audience() {
    let fx = Fixture::new();
    let alice = fx.add(MemoryPlayer::new("alice"));
    let bob = fx.add(MemoryPlayer::new("bob").at(200.0, 0.0, 0.0));

    fx.chat(&alice, "one");
    assert!(bob.inbox().is_empty());

    bob.set_location(Location::new(20.0, 0.0, 0.0));
    fx.chat(&alice, "two");
    assert_eq!(bob.inbox().len(), 1);
}

#[test]
fn local_prefix_and_nation_tag() {
    let mut config = Config::default();
    config.chat.show_local_prefix = true;
    config.chat.towny_enabled = true;
    let towns = MemoryTowns::new(vec![Town {
        name: "Rivertown".into(),
        residents: vec!["alice".into()],
        nation_tag: Some("&cNOR".into()),
    }]);
    let fx = Fixture::with_towns(config, towns);
    let alice = fx.add(MemoryPlayer::new("alice"));
    let bob = fx.add(MemoryPlayer::new("bob"));

    fx.chat(&alice, "hi");
    assert_eq!(strip_colors(&bob.inbox()[0]), "[Local] [NOR] alice: hi");

    // no town, no tag
    fx.chat(&bob, "yo");
    assert_eq!(strip_colors(&alice.inbox()[1]), "[Local] bob: yo");
}

#[test]
fn custom_local_format() {
    let mut config = Config::default();
    config.chat.local_format = "<$PLAYER$> &e$MESSAGE$".to_string();
    config.chat.local_chat_range = 5;
    let fx = Fixture::with_config(config);
    let alice = fx.add(MemoryPlayer::new("alice"));
    let bob = fx.add(MemoryPlayer::new("bob").at(6.0, 0.0, 0.0));

    fx.chat(&alice, "x");
    assert_eq!(alice.inbox(), vec!["<alice> §ex".to_string()]);
    assert!(bob.inbox().is_empty());
}
