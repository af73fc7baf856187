//! Integration tests for the sync engine against the reference server.

mod common;

use chrono::{TimeZone, Utc};
use common::{amount, http_engine, http_engine_for, memory_engine};
use std::sync::Arc;
use subledger_client::protocol::{LifecycleState, Line, ListFilter, NormalBalance, ValueType};
use subledger_client::{
    Account, Book, ClientConfig, ClientError, JournalEntry, Organization, SyncEngine, Transport,
};
use subledger_server::{LedgerServer, ServerConfig};

fn ledger_scenario<T: Transport>(engine: &SyncEngine<T>, server: &LedgerServer) {
    let org = Organization::new("ACME Inc.", Some("https://acme.example/".into()));
    assert!(engine.save(&org).unwrap());
    let org_id = org.id().unwrap();
    assert_eq!(org.version(), Some(1));
    assert!(org.is_active());

    let book = Book::new(&org, "USD", None).unwrap();
    assert!(engine.save(&book).unwrap());
    assert_eq!(book.version(), Some(1));

    let requests = server.request_count();
    assert!(book.organization(engine).unwrap().ptr_eq(&org));
    assert_eq!(server.request_count(), requests);

    let receivable = Account::new(&book, "1210 Accounts Receivable", NormalBalance::Debit, None).unwrap();
    let payable = Account::new(&book, "2110 Accounts Payable", NormalBalance::Credit, None).unwrap();
    assert!(engine.save(&receivable).unwrap());
    assert!(engine.save(&payable).unwrap());

    let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    let entry = JournalEntry::new(
        &book,
        "Recharge account",
        at,
        vec![
            Line::debit(receivable.id().unwrap(), amount("10.00")),
            Line::credit(payable.id().unwrap(), amount("10.00")),
        ],
        Some("https://acme.example/journal_entry/".into()),
    )
    .unwrap();
    assert!(engine.save(&entry).unwrap());

    let requests = server.request_count();
    let loaded = JournalEntry::from_id(engine, &entry.id().unwrap(), &org_id, &book.id().unwrap()).unwrap();
    assert!(loaded.ptr_eq(&entry));
    assert!(entry.book(engine).unwrap().ptr_eq(&book));
    assert!(receivable.organization(engine).unwrap().ptr_eq(&org));
    assert_eq!(server.request_count(), requests);

    let balance = receivable.balance(engine, &at).unwrap();
    assert_eq!(balance.value.kind, ValueType::Debit);
    assert_eq!(balance.value.amount.as_str(), "10");
    let balance = payable.balance(engine, &at).unwrap();
    assert_eq!(balance.value.kind, ValueType::Credit);
}

#[test]
fn scenario_in_memory() {
    let (server, engine) = memory_engine();
    ledger_scenario(&engine, &server);
}

#[test]
fn scenario_over_http() {
    let (server, engine) = http_engine(ServerConfig::default(), ClientConfig::new(common::BASE_URL));
    ledger_scenario(&engine, &server);
}

#[test]
fn save_creates_then_updates() {
    let (server, engine) = memory_engine();
    let org = Organization::new("ACME Inc.", None);

    assert!(engine.save(&org).unwrap());
    let id = org.id().unwrap();

    org.set_description("ACME Corp.");
    assert!(!engine.save(&org).unwrap());
    assert_eq!(org.version(), Some(2));
    assert_eq!(org.id().as_deref(), Some(id.as_str()));

    assert!(!engine.save(&org).unwrap());
    assert_eq!(org.version(), Some(3));
    assert_eq!(server.count("PATCH", &format!("/orgs/{id}")), 2);
}

#[test]
fn stale_update_is_rejected_untouched() {
    let (server, engine) = memory_engine();
    let org = Organization::new("ACME Inc.", None);
    engine.save(&org).unwrap();
    let id = org.id().unwrap();

    // A second client with its own registry holds the same entity.
    let other = http_engine_for(&server, ClientConfig::new(common::BASE_URL));
    let stale = Organization::from_id(&other, &id).unwrap();
    assert!(!stale.ptr_eq(&org));

    org.set_description("ACME Corp.");
    engine.save(&org).unwrap();

    stale.set_description("ACME Ltd.");
    let err = other.save(&stale).unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert!(matches!(err, ClientError::Remote { ref body, .. } if body.contains("version conflict")));
    assert!(!err.is_retryable());
    assert_eq!(stale.version(), Some(1));
    assert_eq!(stale.description(), "ACME Ltd.");
}

#[test]
fn archive_and_activate() {
    let (server, engine) = memory_engine();
    let org = Organization::new("ACME Inc.", None);
    engine.save(&org).unwrap();
    let book = Book::new(&org, "USD", None).unwrap();
    engine.save(&book).unwrap();

    engine.archive(&book).unwrap();
    assert!(!book.is_active());
    assert_eq!(book.state_tag().unwrap().as_str(), "archived_book");
    assert_eq!(book.version(), Some(1));

    engine.archive(&book).unwrap();
    assert!(!book.is_active());

    engine.activate(&book).unwrap();
    assert!(book.is_active());

    let path = format!("/orgs/{}/books/{}/archive", org.id().unwrap(), book.id().unwrap());
    assert_eq!(server.count("POST", &path), 2);

    // Updating after a transition still proposes the next version.
    book.set_description("US Dollars");
    engine.save(&book).unwrap();
    assert_eq!(book.version(), Some(2));
}

#[test]
fn unsaved_entities_cannot_transition() {
    let (server, engine) = memory_engine();
    let err = engine.activate(&Organization::new("ACME Inc.", None)).unwrap_err();
    assert!(matches!(err, ClientError::NotPersisted { .. }));
    assert_eq!(server.request_count(), 0);
}

#[test]
fn listing_shares_instances_with_lookups() {
    let (server, engine) = memory_engine();
    let org = Organization::new("ACME Inc.", None);
    engine.save(&org).unwrap();
    for currency in ["EUR", "USD", "GBP"] {
        engine.save(&Book::new(&org, currency, None).unwrap()).unwrap();
    }

    // Fresh client, empty registry.
    let reader = http_engine_for(&server, ClientConfig::new(common::BASE_URL));
    let org = Organization::from_id(&reader, &org.id().unwrap()).unwrap();
    let books: Vec<Book> = Book::all(&reader, &org, &ListFilter::default())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let names: Vec<String> = books.iter().map(|book| book.description()).collect();
    assert_eq!(names, ["EUR", "GBP", "USD"]);

    let before = server.request_count();
    for book in &books {
        let again = Book::from_id(&reader, &book.id().unwrap(), &org.id().unwrap()).unwrap();
        assert!(again.ptr_eq(book));
        assert!(again.organization(&reader).unwrap().ptr_eq(&org));
    }
    assert_eq!(server.request_count(), before);
}

#[test]
fn listing_by_state_and_limit() {
    let (_server, engine) = memory_engine();
    let org = Organization::new("ACME Inc.", None);
    engine.save(&org).unwrap();
    let book = Book::new(&org, "USD", None).unwrap();
    engine.save(&book).unwrap();
    let names = ["1000 Cash", "1210 Accounts Receivable", "2110 Accounts Payable"];
    let accounts: Vec<Account> = names
        .iter()
        .map(|name| {
            let account = Account::new(&book, *name, NormalBalance::Debit, None).unwrap();
            engine.save(&account).unwrap();
            account
        })
        .collect();
    engine.archive(&accounts[0]).unwrap();

    let active: Vec<Account> = Account::all(&engine, &book, &ListFilter::new().with_limit(1))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(active.len(), 1);
    assert!(active[0].ptr_eq(&accounts[1]));

    let archived: Vec<Account> = Account::all(
        &engine,
        &book,
        &ListFilter::new().with_state(LifecycleState::Archived),
    )
    .unwrap()
    .collect::<Result<_, _>>()
    .unwrap();
    assert_eq!(archived.len(), 1);
    assert!(archived[0].ptr_eq(&accounts[0]));
    assert!(!archived[0].is_active());
}

#[test]
fn journal_entries_read_back_in_fresh_client() {
    let (server, engine) = memory_engine();
    let org = Organization::new("ACME Inc.", None);
    engine.save(&org).unwrap();
    let book = Book::new(&org, "USD", None).unwrap();
    engine.save(&book).unwrap();
    let cash = Account::new(&book, "1000 Cash", NormalBalance::Debit, None).unwrap();
    let revenue = Account::new(&book, "4000 Revenue", NormalBalance::Credit, None).unwrap();
    engine.save(&cash).unwrap();
    engine.save(&revenue).unwrap();
    let at = Utc.with_ymd_and_hms(2024, 6, 30, 17, 0, 0).unwrap();
    let lines = vec![
        Line::debit(cash.id().unwrap(), amount("42.50")),
        Line::credit(revenue.id().unwrap(), amount("42.50")),
    ];
    let written = JournalEntry::new(&book, "Sale", at, lines.clone(), None).unwrap();
    engine.save(&written).unwrap();

    let (org_id, book_id) = (org.id().unwrap(), book.id().unwrap());
    let reader = http_engine_for(&server, ClientConfig::new(common::BASE_URL));
    let book = Book::from_id(&reader, &book_id, &org_id).unwrap();
    let entries: Vec<JournalEntry> = JournalEntry::all(&reader, &book, &ListFilter::default())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert!(!entry.ptr_eq(&written));
    assert_eq!(entry.id(), written.id());
    assert_eq!(entry.effective_at(), at);
    assert_eq!(entry.lines(), lines);
    assert!(entry.is_active());

    let before = server.request_count();
    let again = JournalEntry::from_id(&reader, &entry.id().unwrap(), &org_id, &book_id).unwrap();
    assert!(again.ptr_eq(entry));
    assert!(entry.book(&reader).unwrap().ptr_eq(&book));
    assert_eq!(server.request_count(), before);

    let account = Account::from_id(&reader, &cash.id().unwrap(), &org_id, &book_id).unwrap();
    let before = server.request_count();
    assert!(account.book(&reader).unwrap().ptr_eq(&book));
    assert_eq!(server.request_count(), before);
    assert_eq!(account.normal_balance(), NormalBalance::Debit);
}

#[test]
fn kind_mismatch_on_reused_id() {
    let (_server, engine) = memory_engine();
    let org = Organization::new("ACME Inc.", None);
    engine.save(&org).unwrap();
    let org_id = org.id().unwrap();

    let err = Book::from_id(&engine, &org_id, &org_id).unwrap_err();
    assert!(matches!(err, ClientError::KindMismatch { .. }));
}

#[test]
fn missing_entity_is_not_cached() {
    let (server, engine) = memory_engine();
    let err = Organization::from_id(&engine, "missing").unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(!engine.registry().contains("missing"));

    assert!(Organization::from_id(&engine, "missing").is_err());
    assert_eq!(server.count("GET", "/orgs/missing"), 2);
}

#[test]
fn unbalanced_entry_surfaces_server_error() {
    let (_server, engine) = memory_engine();
    let org = Organization::new("ACME Inc.", None);
    engine.save(&org).unwrap();
    let book = Book::new(&org, "USD", None).unwrap();
    engine.save(&book).unwrap();
    let cash = Account::new(&book, "Cash", NormalBalance::Debit, None).unwrap();
    engine.save(&cash).unwrap();

    let entry = JournalEntry::new(
        &book,
        "One-sided",
        Utc::now(),
        vec![Line::debit(cash.id().unwrap(), amount("5"))],
        None,
    )
    .unwrap();
    let err = engine.save(&entry).unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(!entry.is_persisted());
}

#[test]
fn shared_registry_across_engines() {
    let (server, engine) = memory_engine();
    let org = Organization::new("ACME Inc.", None);
    engine.save(&org).unwrap();

    let other = SyncEngine::with_registry(
        ClientConfig::new(common::BASE_URL),
        common::InMemoryTransport::new(Arc::clone(&server)),
        Arc::clone(engine.registry()),
    );
    let before = server.request_count();
    assert!(Organization::from_id(&other, &org.id().unwrap()).unwrap().ptr_eq(&org));
    assert_eq!(server.request_count(), before);
}

#[test]
fn eviction_forces_refetch() {
    let (server, engine) = memory_engine();
    let org = Organization::new("ACME Inc.", None);
    engine.save(&org).unwrap();
    let id = org.id().unwrap();

    assert!(engine.registry().evict(&id));
    let reloaded = Organization::from_id(&engine, &id).unwrap();
    assert!(!reloaded.ptr_eq(&org));
    assert_eq!(reloaded.description(), "ACME Inc.");
    assert_eq!(server.count("GET", &format!("/orgs/{id}")), 1);
}
