mod common;

use common::{id, Fixture};
use sinkchat::chat::format::strip_colors;
use sinkchat::chat::memory::MemoryPlayer;
use sinkchat::chat::{ChatError, Player};

fn last(player: &MemoryPlayer) -> String {
    strip_colors(player.inbox().last().map(String::as_str).unwrap_or(""))
}

#[tokio::test]
async fn channel_leave_confirms_privately() {
    let fx = Fixture::new();
    let alice = fx.member("alice");
    let bob = fx.member("bob");

    assert!(fx.server.execute_command(id(&alice), "/channel leave shout").await.unwrap());
    assert_eq!(alice.inbox().len(), 1);
    assert_eq!(last(&alice), "[Channel] You left the Shout channel.");
    assert_eq!(last(&bob), "[Shout] alice left the Shout channel.");

    fx.clear_inboxes();
    fx.chat(&bob, "!ping");
    assert!(alice.inbox().is_empty());

    fx.server.execute_command(id(&alice), "/ch join SHOUT").await.unwrap();
    fx.chat(&bob, "!ping");
    assert_eq!(last(&alice), "[Shout] [Default] bob: ping");
}

#[tokio::test]
async fn channel_errors_and_listing() {
    let fx = Fixture::new();
    let alice = fx.member("alice");

    fx.server.execute_command(id(&alice), "/channel join nope").await.unwrap();
    assert_eq!(last(&alice), "[Channel] nope is an unknown channel.");

    fx.server.execute_command(id(&alice), "/channel leave").await.unwrap();
    assert_eq!(last(&alice), "[Channel] You must write the name of the channel!");

    fx.server.execute_command(id(&alice), "/channel list").await.unwrap();
    assert_eq!(
        last(&alice),
        "[Channel] These channels are available: Shout (!), Trade ($), Help (?)"
    );

    fx.server.execute_command(id(&alice), "/channel leave trade").await.unwrap();
    fx.server.execute_command(id(&alice), "/channel part").await.unwrap();
    assert_eq!(
        last(&alice),
        "[Channel] You have the following channels enabled: Shout, Help"
    );

    fx.server.execute_command(id(&alice), "/channel").await.unwrap();
    assert!(last(&alice).starts_with("[Channel] These commands are available"));
}

#[tokio::test]
async fn channel_join_requires_permission() {
    let fx = Fixture::new();
    let guest = fx.add(MemoryPlayer::new("guest"));
    let shout = fx.server.registry().by_name("Shout").unwrap().clone();
    shout.add_excepted(id(&guest));

    fx.server.execute_command(id(&guest), "/channel join shout").await.unwrap();
    assert_eq!(last(&guest), "You may not use the shout channel.");
    assert!(shout.is_excepted(id(&guest)));
}

#[tokio::test]
async fn nick_changes_display_name_and_store() {
    let fx = Fixture::new();
    let alice = fx.member("alice");

    fx.server.execute_command(id(&alice), "/nick &aAlly").await.unwrap();
    assert_eq!(alice.display_name(), "§aAlly");
    assert_eq!(last(&alice), "[Nick] Your name is now Ally!");
    assert_eq!(fx.store.nickname(id(&alice)), Some("§aAlly".to_string()));

    fx.clear_inboxes();
    fx.chat(&alice, "!hi");
    assert_eq!(last(&alice), "[Shout] [Default] Ally: hi");

    fx.server.execute_command(id(&alice), "/nick off").await.unwrap();
    assert_eq!(alice.display_name(), "alice");
    assert_eq!(fx.store.nickname(id(&alice)), None);
}

#[tokio::test]
async fn nick_validation_replies() {
    let fx = Fixture::new();
    let alice = fx.member("alice");
    let bob = fx.member("bob");
    bob.set_display_name("Bobby");

    fx.server.execute_command(id(&alice), "/nick bad-name!").await.unwrap();
    assert_eq!(last(&alice), "[Nick] Illegal nickname!");

    fx.server.execute_command(id(&alice), "/nick ABCDEFGHIJKLMNOPQ").await.unwrap();
    assert_eq!(last(&alice), "[Nick] Nickname is too long!");

    fx.server.execute_command(id(&alice), "/nick bobby").await.unwrap();
    assert_eq!(last(&alice), "[Nick] Nickname is already used by someone else!");

    fx.server.execute_command(id(&alice), "/nick Bob").await.unwrap();
    assert_eq!(last(&alice), "[Nick] Nickname is already used by someone else!");

    assert_eq!(alice.display_name(), "alice");
    assert_eq!(fx.store.nickname(id(&alice)), None);
}

#[tokio::test]
async fn nick_for_other_player() {
    let fx = Fixture::new();
    let alice = fx.member("alice");
    let bob = fx.member("bob");

    fx.server.execute_command(id(&alice), "/nick bob Bobby").await.unwrap();
    assert_eq!(last(&alice), "You may not change the nickname of other players!");
    assert_eq!(bob.display_name(), "bob");

    alice.grant("sinkchat.nick.other");
    fx.server.execute_command(id(&alice), "/nick bob Bobby").await.unwrap();
    assert_eq!(bob.display_name(), "Bobby");
    assert_eq!(last(&alice), "[Nick] bob's name is now Bobby!");
    assert_eq!(last(&bob), "[Nick] Your name is now Bobby!");

    fx.server.execute_command(id(&alice), "/nick ghost Boo").await.unwrap();
    assert_eq!(last(&alice), "ghost is not online!");
}

#[tokio::test]
async fn spy_toggles_are_persisted() {
    let fx = Fixture::new();
    let alice = fx.member("alice");

    fx.server.execute_command(id(&alice), "/enablespy").await.unwrap();
    assert_eq!(last(&alice), "Spy chat has been enabled!");
    assert!(fx.store.spy_enabled(id(&alice)));

    fx.server.execute_command(id(&alice), "/enablespy").await.unwrap();
    assert_eq!(last(&alice), "Spy chat has already been enabled!");

    fx.server.execute_command(id(&alice), "/disablespy").await.unwrap();
    assert_eq!(last(&alice), "Spy chat has been disabled!");
    assert!(!fx.store.spy_enabled(id(&alice)));

    fx.server.execute_command(id(&alice), "/disablespy").await.unwrap();
    assert_eq!(last(&alice), "Spy chat has already been disabled!");
}

#[tokio::test]
async fn teamchat_reaches_team_only() {
    let fx = Fixture::new();
    let mod_a = fx.add(MemoryPlayer::new("mod_a").with_permissions(&["sinkcommands.teamchat"]));
    let mod_b = fx.add(
        MemoryPlayer::new("mod_b")
            .at(9000.0, 0.0, 0.0)
            .with_permissions(&["sinkcommands.teamchat"]),
    );
    let user = fx.add(MemoryPlayer::new("user"));

    fx.server.execute_command(id(&mod_a), "/tc &cgrief at spawn").await.unwrap();
    assert_eq!(last(&mod_b), "[TeamChat] mod_a: grief at spawn");
    assert_eq!(mod_a.inbox().len(), 1);
    assert!(user.inbox().is_empty());
    assert_eq!(fx.directory.console_lines().len(), 1);

    fx.server.execute_command(id(&user), "/teamchat hello?").await.unwrap();
    assert_eq!(last(&user), "You don't have permission to do that.");
    assert_eq!(mod_a.inbox().len(), 1);

    fx.server.execute_command(id(&user), "/teamchat").await.unwrap();
    assert_eq!(last(&user), "Usage: /teamchat <message>");
}

#[tokio::test]
async fn unknown_commands_are_not_claimed() {
    let fx = Fixture::new();
    let alice = fx.member("alice");
    assert!(!fx.server.execute_command(id(&alice), "/home").await.unwrap());
    assert!(!fx.server.execute_command(id(&alice), "channel list").await.unwrap());
    assert!(alice.inbox().is_empty());

    let stranger = MemoryPlayer::new("stranger");
    assert!(matches!(
        fx.server.execute_command(stranger.id(), "/enablespy").await,
        Err(ChatError::UnknownPlayer(_))
    ));
}

#[tokio::test]
async fn stored_nickname_is_restored_on_join() {
    let fx = Fixture::new();
    let alice = fx.member("alice");
    let bob = fx.member("bob");
    fx.store.set_nickname(id(&alice), "alice", Some("Ally".to_string()));
    fx.store.set_nickname(id(&bob), "bob", Some("bob".to_string()));

    fx.server.on_player_join(id(&alice)).await.unwrap();
    fx.server.on_player_join(id(&bob)).await.unwrap();

    assert_eq!(alice.display_name(), "Ally");
    assert_eq!(bob.display_name(), "bob");
    assert_eq!(fx.store.nickname(id(&bob)), None);
}
