mod common;

use bank_ledger::ledger::{
    AccountRepository, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    EntryRepository, LedgerError, ListAccountsParams, UpdateAccountParams,
};
use bank_ledger::random::RandomGen;
use common::{create_account, create_random_account, create_test_store};

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_create_and_get_account() {
    let store = create_test_store().await;
    let mut rng = RandomGen::from_entropy();
    let account = create_random_account(&store, &mut rng, 0).await;

    let fetched = AccountRepository::get(store.pool(), account.id)
        .await
        .expect("Should get account");
    assert_eq!(fetched, account);
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_update_account_changes_only_balance() {
    let store = create_test_store().await;
    let mut rng = RandomGen::from_entropy();
    let account = create_random_account(&store, &mut rng, 0).await;

    let new_balance = rng.money();
    let updated = AccountRepository::update(
        store.pool(),
        UpdateAccountParams {
            id: account.id,
            balance: new_balance,
        },
    )
    .await
    .expect("Should update account");

    assert_eq!(updated.id, account.id);
    assert_eq!(updated.owner, account.owner);
    assert_eq!(updated.currency, account.currency);
    assert_eq!(updated.created_at, account.created_at);
    assert_eq!(updated.balance, new_balance);
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_add_balance_is_relative() {
    let store = create_test_store().await;
    let mut rng = RandomGen::from_entropy();
    let account = create_random_account(&store, &mut rng, 100).await;

    let credited = AccountRepository::add_balance(
        store.pool(),
        AddAccountBalanceParams {
            id: account.id,
            amount: 40,
        },
    )
    .await
    .unwrap();
    assert_eq!(credited.balance, account.balance + 40);

    let debited = AccountRepository::add_balance(
        store.pool(),
        AddAccountBalanceParams {
            id: account.id,
            amount: -100,
        },
    )
    .await
    .unwrap();
    assert_eq!(debited.balance, account.balance - 60);
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_delete_then_get_is_not_found() {
    let store = create_test_store().await;
    let mut rng = RandomGen::from_entropy();
    let account = create_random_account(&store, &mut rng, 0).await;

    AccountRepository::delete(store.pool(), account.id)
        .await
        .expect("Should delete account");

    let err = AccountRepository::get(store.pool(), account.id)
        .await
        .unwrap_err();
    assert!(
        matches!(err, LedgerError::NotFound { entity: "account", id } if id == account.id),
        "unexpected error: {err}"
    );

    let err = AccountRepository::delete(store.pool(), account.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_missing_account_is_not_found_for_every_lookup() {
    let store = create_test_store().await;

    let err = AccountRepository::get(store.pool(), i64::MAX).await.unwrap_err();
    assert!(err.is_not_found());

    let err = AccountRepository::update(
        store.pool(),
        UpdateAccountParams {
            id: i64::MAX,
            balance: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_not_found());

    let err = AccountRepository::add_balance(
        store.pool(),
        AddAccountBalanceParams {
            id: i64::MAX,
            amount: 1,
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_delete_referenced_account_is_foreign_key_violation() {
    let store = create_test_store().await;
    let mut rng = RandomGen::from_entropy();
    let account = create_random_account(&store, &mut rng, 0).await;

    EntryRepository::create(
        store.pool(),
        CreateEntryParams {
            account_id: account.id,
            amount: 10,
        },
    )
    .await
    .unwrap();

    let err = AccountRepository::delete(store.pool(), account.id)
        .await
        .unwrap_err();
    assert!(
        matches!(err, LedgerError::ForeignKeyViolation(_)),
        "unexpected error: {err}"
    );
    assert!(AccountRepository::get(store.pool(), account.id).await.is_ok());
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_duplicate_owner_currency_is_unique_violation() {
    let store = create_test_store().await;
    let mut rng = RandomGen::from_entropy();
    let account = create_random_account(&store, &mut rng, 0).await;

    let err = AccountRepository::create(
        store.pool(),
        &CreateAccountParams {
            owner: account.owner.clone(),
            balance: 0,
            currency: account.currency.clone(),
        },
    )
    .await
    .unwrap_err();
    assert!(
        matches!(err, LedgerError::UniqueViolation(_)),
        "unexpected error: {err}"
    );
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_invalid_currency_rejected_before_insert() {
    let store = create_test_store().await;
    let mut rng = RandomGen::from_entropy();
    let owner = rng.owner();

    let err = AccountRepository::create(
        store.pool(),
        &CreateAccountParams {
            owner: owner.clone(),
            balance: 0,
            currency: "usd".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidCurrency(_)));

    let accounts = AccountRepository::list(
        store.pool(),
        &ListAccountsParams {
            owner,
            limit: 10,
            offset: 0,
        },
    )
    .await
    .unwrap();
    assert!(accounts.is_empty());
}

#[tokio::test]
#[ignore = "requires PostgreSQL database"]
async fn test_list_accounts_pagination() {
    let store = create_test_store().await;
    let mut rng = RandomGen::from_entropy();
    let owner = rng.owner();

    let currencies = [
        "USD", "EUR", "GBP", "JPY", "CAD", "AUD", "CHF", "CNY", "SEK", "NZD",
    ];
    let mut created = Vec::new();
    for currency in currencies {
        let params = CreateAccountParams {
            owner: owner.clone(),
            balance: rng.money(),
            currency: currency.to_string(),
        };
        created.push(create_account(&store, &params).await);
    }

    let cases = [
        ("first page", 5, 0, 5),
        ("second page", 5, 5, 5),
        ("all", 10, 0, 10),
        ("limit above available", 50, 0, 10),
        ("offset beyond rows", 5, 15, 0),
    ];

    for (name, limit, offset, expected) in cases {
        let accounts = AccountRepository::list(
            store.pool(),
            &ListAccountsParams {
                owner: owner.clone(),
                limit,
                offset,
            },
        )
        .await
        .unwrap_or_else(|e| panic!("{name}: {e}"));

        assert_eq!(accounts.len(), expected, "{name}");
        assert!(accounts.iter().all(|a| a.owner == owner), "{name}");
    }

    // Insertion order
    let all = AccountRepository::list(
        store.pool(),
        &ListAccountsParams {
            owner: owner.clone(),
            limit: 10,
            offset: 0,
        },
    )
    .await
    .unwrap();
    assert_eq!(all, created);

    let none = AccountRepository::list(
        store.pool(),
        &ListAccountsParams {
            owner: format!("{owner}_nobody"),
            limit: 5,
            offset: 0,
        },
    )
    .await
    .unwrap();
    assert!(none.is_empty());
}
