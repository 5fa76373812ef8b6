//! Mailbox scanner and connection check against scripted IMAP sessions.

#![allow(clippy::unwrap_used)]

mod common;

use common::{Script, ScriptedConnector, header, message, plain_message, sent_text, settings};
use mailpost_core::{
    DEFAULT_SUBJECT, Error, MailboxScanner, ProcessedIds, Settings, check_connection,
};

#[tokio::test]
async fn sender_filter_unions_searches_and_escapes_quotes() {
    let connector = ScriptedConnector::new();
    let fresh = header(Some("<fresh@x>"), "=?UTF-8?Q?Caf=C3=A9_Weekly?=");
    let sent = connector.push(
        Script::new()
            .logged_in(5)
            .ok(&["* SEARCH 4 2"])
            .no("SEARCH failed")
            .fetch(2, &header(Some("<old@x>"), "Old"))
            .fetch(4, &fresh)
            .fetch(4, &message(&fresh, "<p>fresh</p>"))
            .stored(4)
            .logout(),
    );
    let settings = Settings {
        filter_senders: true,
        qualified_senders: vec!["news@a.com".to_string(), "evil\"@x.com".to_string()],
        ..settings()
    };
    let processed: ProcessedIds = ["<old@x>".to_string()].into_iter().collect();

    let mut scanner = MailboxScanner::new(connector);
    let items = scanner.scan(&settings, &processed).await.unwrap();

    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.sequence_number, 4);
    assert_eq!(item.message_id, "<fresh@x>");
    assert_eq!(item.subject, "Café Weekly");
    assert_eq!(item.html, "<p>fresh</p>");
    assert_eq!(item.raw_date, "Tue, 17 Feb 2026 09:00:00 +0000");

    let sent = sent_text(&sent);
    assert!(sent.contains("A0003 SEARCH FROM \"news@a.com\"\r\n"));
    assert!(sent.contains("A0004 SEARCH FROM \"evil\\\"@x.com\"\r\n"));
    assert!(!sent.contains("SEARCH ALL"));
    assert!(!sent.contains("STORE 2"));
    assert!(sent.contains("A0005 STORE 4 +FLAGS (\\Seen)\r\n"));
    assert!(sent.ends_with("A0006 LOGOUT\r\n"));
}

#[tokio::test]
async fn failed_search_all_means_no_mail() {
    let connector = ScriptedConnector::new();
    let sent = connector.push(Script::new().logged_in(3).no("SEARCH not allowed").logout());

    let items = MailboxScanner::new(connector)
        .scan(&settings(), &ProcessedIds::new())
        .await
        .unwrap();

    assert!(items.is_empty());
    assert!(sent_text(&sent).ends_with("A0004 LOGOUT\r\n"));
}

#[tokio::test]
async fn plain_text_message_yields_nothing_but_is_marked_seen() {
    let connector = ScriptedConnector::new();
    let head = header(Some("<plain@x>"), "Text only");
    let sent = connector.push(
        Script::new()
            .logged_in(1)
            .ok(&["* SEARCH 1"])
            .fetch(1, &head)
            .fetch(1, &plain_message(&head))
            .stored(1)
            .logout(),
    );

    let items = MailboxScanner::new(connector)
        .scan(&settings(), &ProcessedIds::new())
        .await
        .unwrap();

    assert!(items.is_empty());
    assert!(sent_text(&sent).contains("A0004 STORE 1 +FLAGS (\\Seen)\r\n"));
}

#[tokio::test]
async fn empty_header_fetch_skips_message() {
    let connector = ScriptedConnector::new();
    let head = header(Some("<ok@x>"), "Kept");
    let sent = connector.push(
        Script::new()
            .logged_in(2)
            .ok(&["* SEARCH 1 2"])
            .fetch_nothing(1)
            .fetch(2, &head)
            .fetch(2, &message(&head, "<p>kept</p>"))
            .stored(2)
            .logout(),
    );

    let items = MailboxScanner::new(connector)
        .scan(&settings(), &ProcessedIds::new())
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].sequence_number, 2);
    let sent = sent_text(&sent);
    assert!(!sent.contains("FETCH 1 BODY[]"));
    assert!(!sent.contains("STORE 1 "));
}

#[tokio::test]
async fn missing_subject_defaults_to_newsletter() {
    let connector = ScriptedConnector::new();
    let head = b"Message-ID: <nosubject@x>\r\n\r\n".to_vec();
    connector.push(
        Script::new()
            .logged_in(1)
            .ok(&["* SEARCH 1"])
            .fetch(1, &head)
            .fetch(1, &message(&head, "<p>x</p>"))
            .stored(1)
            .logout(),
    );

    let items = MailboxScanner::new(connector)
        .scan(&settings(), &ProcessedIds::new())
        .await
        .unwrap();

    assert_eq!(items[0].subject, DEFAULT_SUBJECT);
    assert_eq!(items[0].raw_date, "");
}

#[tokio::test]
async fn select_failure_is_returned() {
    let connector = ScriptedConnector::new();
    let sent = connector.push(Script::new().ok(&[]).no("[NONEXISTENT] Unknown mailbox"));
    let settings = Settings {
        folder: "Newsletters".to_string(),
        ..settings()
    };

    let err = MailboxScanner::new(connector)
        .scan(&settings, &ProcessedIds::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Imap(mailpost_imap::Error::Imap(ref line)) if line.contains("Unknown mailbox")));
    let sent = sent_text(&sent);
    assert!(sent.contains("A0002 SELECT \"Newsletters\"\r\n"));
    assert!(!sent.contains("LOGOUT"));
}

#[tokio::test]
async fn bad_greeting_is_connection_failure() {
    let connector = ScriptedConnector::new();
    connector.push(Script::with_greeting("* BYE too busy"));

    let err = MailboxScanner::new(connector)
        .scan(&settings(), &ProcessedIds::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Imap(mailpost_imap::Error::ConnectionFailed(_))));
}

#[tokio::test]
async fn check_connection_reports_message_count() {
    let connector = ScriptedConnector::new();
    let sent = connector.push(Script::new().logged_in(12).logout());

    let message = check_connection(&settings(), &connector).await.unwrap();

    assert_eq!(message, "Connection successful! Mailbox has 12 message(s).");
    assert!(sent_text(&sent).ends_with("A0003 LOGOUT\r\n"));
}

#[tokio::test]
async fn check_connection_requires_settings() {
    let connector = ScriptedConnector::new();
    let err = check_connection(&Settings::default(), &connector)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingSettings(_)));
}
