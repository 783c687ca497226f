//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Conservation: sum of balances == total supply after every operation
//! - Authorization: non-administrators never mutate privileged state
//! - Claim round-trip: surrendered tokens land in the pool, once

use proptest::prelude::*;
use swap_ledger::{
    AccountId, AuditKind, Config, Error, ExternalAddress, ReferenceId, SwapLedger,
};

/// Operations a caller can attempt against the ledger
#[derive(Debug, Clone)]
enum Op {
    Mint { account: AccountId, amount: u64 },
    Burn { account: AccountId, amount: u64 },
    Transfer { from: AccountId, to: AccountId, amount: u64 },
    Claim { account: AccountId, amount: u64 },
    Credit { reference: ReferenceId, account: AccountId, amount: u64 },
}

fn account_strategy() -> impl Strategy<Value = AccountId> {
    (0..4u8).prop_map(|i| AccountId::new(format!("user-{}", i)))
}

fn amount_strategy() -> impl Strategy<Value = u64> {
    0u64..1_000
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (account_strategy(), amount_strategy())
            .prop_map(|(account, amount)| Op::Mint { account, amount }),
        (account_strategy(), amount_strategy())
            .prop_map(|(account, amount)| Op::Burn { account, amount }),
        (account_strategy(), account_strategy(), amount_strategy())
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
        (account_strategy(), amount_strategy())
            .prop_map(|(account, amount)| Op::Claim { account, amount }),
        ("[a-f0-9]{8}", account_strategy(), amount_strategy()).prop_map(
            |(reference, account, amount)| Op::Credit {
                reference: ReferenceId::new(reference),
                account,
                amount,
            }
        ),
    ]
}

fn create_test_ledger() -> (SwapLedger, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();
    (SwapLedger::open(config).unwrap(), temp_dir)
}

fn admin() -> AccountId {
    AccountId::new("admin")
}

async fn apply(ledger: &SwapLedger, op: Op) {
    // Rejections are expected for many generated inputs; only the
    // invariants matter here
    let _ = match op {
        Op::Mint { account, amount } => ledger.mint(&admin(), &account, amount).await,
        Op::Burn { account, amount } => ledger.burn(&account, amount).await,
        Op::Transfer { from, to, amount } => ledger.transfer(&from, &to, amount).await,
        Op::Claim { account, amount } => {
            ledger
                .claim_external_payout(&account, amount, &ExternalAddress::new("ext-dest"))
                .await
        }
        Op::Credit {
            reference,
            account,
            amount,
        } => ledger.credit_deposit(&admin(), &reference, &account, amount).await,
    };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: conservation holds after every operation in any sequence
    #[test]
    fn prop_conservation(ops in prop::collection::vec(op_strategy(), 1..15)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger();

            for op in ops {
                apply(&ledger, op).await;
                prop_assert!(ledger.verify_conservation().unwrap());
            }

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: a non-administrator caller is always rejected by privileged
    /// operations and leaves no trace in the ledger
    #[test]
    fn prop_non_admin_rejected(caller in "[a-z]{3,12}", value in 1u64..1_000_000) {
        prop_assume!(caller != "admin");

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger();
            let caller = AccountId::new(caller);

            let mint = ledger.mint(&caller, &caller, value).await;
            prop_assert!(matches!(mint, Err(Error::Unauthorized(_))));

            let ratio = ledger.set_conversion_ratio(&caller, value).await;
            prop_assert!(matches!(ratio, Err(Error::Unauthorized(_))));

            prop_assert_eq!(ledger.total_supply().unwrap(), 0);
            prop_assert_eq!(ledger.conversion_ratio().unwrap(), 100_000);
            prop_assert_eq!(ledger.latest_seq().unwrap(), None);

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: claiming n of a balance b >= n leaves b - n and records
    /// exactly one payout request with the claimed fields
    #[test]
    fn prop_claim_round_trip(balance in 1u64..1_000_000, claimed in 1u64..1_000_000) {
        prop_assume!(claimed <= balance);

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (ledger, _temp) = create_test_ledger();
            let holder = AccountId::new("holder");
            let destination = ExternalAddress::new("bc1qu3hn8ethh3rd0wrfpm0qfwrs0cvvfj45npgaz8");

            ledger.mint(&admin(), &holder, balance).await.unwrap();
            ledger
                .claim_external_payout(&holder, claimed, &destination)
                .await
                .unwrap();

            prop_assert_eq!(ledger.balance_of(&holder).unwrap(), balance - claimed);

            let requests: Vec<_> = ledger
                .events_by_customer(&holder)
                .unwrap()
                .into_iter()
                .filter(|e| matches!(e.kind, AuditKind::PayoutRequested { .. }))
                .collect();
            prop_assert_eq!(requests.len(), 1);
            prop_assert_eq!(
                &requests[0].kind,
                &AuditKind::PayoutRequested {
                    customer: holder.clone(),
                    external_address: destination,
                    token_amount: claimed,
                }
            );

            ledger.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}

mod integration_tests {
    use super::*;

    /// Reference-id filtering stays exact when unrelated references are
    /// interleaved
    #[tokio::test]
    async fn test_reference_filtering_with_interleaved_credits() {
        let (ledger, _temp) = create_test_ledger();
        let pool = ledger.token_pool().unwrap();
        let customer = AccountId::new("customer");

        ledger.mint(&admin(), &pool, 1_000).await.unwrap();

        let needle = ReferenceId::new("ref-g");
        assert!(ledger.events_by_reference(&needle).unwrap().is_empty());

        for name in ["ref-a", "ref-b", "ref-c", "ref-d", "ref-e", "ref-f", "ref-g", "ref-h"] {
            ledger
                .credit_deposit(&admin(), &ReferenceId::new(name), &customer, 10)
                .await
                .unwrap();
        }

        let found = ledger.events_by_reference(&needle).unwrap();
        assert_eq!(found.len(), 1);
        assert!(matches!(
            found[0].kind,
            AuditKind::DepositCredited { ref reference, .. } if *reference == needle
        ));

        ledger.shutdown().await.unwrap();
    }

    /// Two deposit days, a claim and its confirmation, end to end
    #[tokio::test]
    async fn test_full_swap_lifecycle() {
        let (ledger, _temp) = create_test_ledger();
        let admin = admin();
        let user1 = AccountId::new("user-1");
        let user2 = AccountId::new("user-2");
        let deposit_ref_1 = ReferenceId::new("0x4b51e7469d6e9aec84c7140c078dd525");
        let deposit_ref_2 = ReferenceId::new("0x51374811dbae4acf654d7edc0a8872e2");
        let payout_ref = ReferenceId::new("0xd6dc617db05e69c7f78e305d60503484");
        let btc_address_1 = ExternalAddress::new("1QATswVJC5LMRxxARzFmidQ6PrfgnJy5Bu");

        // Operator routes custody through the admin balance
        ledger.set_token_pool(&admin, &admin).await.unwrap();
        ledger.mint(&admin, &admin, 1337).await.unwrap();

        // Day 1: external deposit observed, ratio updated, tokens delivered
        ledger.set_conversion_ratio(&admin, 99_888).await.unwrap();
        assert_eq!(ledger.conversion_ratio().unwrap(), 99_888);

        assert!(ledger.events_by_reference(&deposit_ref_1).unwrap().is_empty());
        ledger
            .credit_deposit(&admin, &deposit_ref_1, &user1, 666)
            .await
            .unwrap();

        assert_eq!(ledger.balance_of(&user1).unwrap(), 666);
        assert_eq!(ledger.balance_of(&admin).unwrap(), 1337 - 666);

        let credited = ledger.events_by_reference(&deposit_ref_1).unwrap();
        assert_eq!(credited.len(), 1);
        assert_eq!(
            credited[0].kind,
            AuditKind::DepositCredited {
                reference: deposit_ref_1.clone(),
                customer: user1.clone(),
                token_amount: 666,
                ratio: 99_888,
            }
        );

        // Day 2: second deposit at a new ratio, then user1 claims back
        ledger.set_conversion_ratio(&admin, 88_777).await.unwrap();
        ledger
            .credit_deposit(&admin, &deposit_ref_2, &user2, 111)
            .await
            .unwrap();
        assert_eq!(ledger.balance_of(&user2).unwrap(), 111);
        assert_eq!(ledger.balance_of(&admin).unwrap(), 1337 - 666 - 111);

        ledger
            .claim_external_payout(&user1, 555, &btc_address_1)
            .await
            .unwrap();
        assert_eq!(ledger.balance_of(&user1).unwrap(), 111);

        let requests: Vec<_> = ledger
            .events_by_customer(&user1)
            .unwrap()
            .into_iter()
            .filter(|e| matches!(e.kind, AuditKind::PayoutRequested { .. }))
            .collect();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].kind,
            AuditKind::PayoutRequested {
                customer: user1.clone(),
                external_address: btc_address_1,
                token_amount: 555,
            }
        );

        // Operator pays out on the external network and confirms
        let supply_before = ledger.total_supply().unwrap();
        ledger
            .confirm_payout(&admin, &payout_ref, &user1, 35_000_000)
            .await
            .unwrap();
        assert_eq!(ledger.total_supply().unwrap(), supply_before);

        let confirmed = ledger.events_by_reference(&payout_ref).unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(
            confirmed[0].kind,
            AuditKind::PayoutConfirmed {
                reference: payout_ref.clone(),
                customer: user1.clone(),
                external_amount: 35_000_000,
                ratio: 88_777,
            }
        );

        // Whole-log scan is contiguous and conservation held throughout
        let latest = ledger.latest_seq().unwrap().unwrap();
        let all = ledger.events_in_range(0, latest).unwrap();
        assert_eq!(all.len(), latest as usize + 1);
        for (i, event) in all.iter().enumerate() {
            assert_eq!(event.seq, i as u64);
        }
        assert!(ledger.verify_conservation().unwrap());

        ledger.shutdown().await.unwrap();
    }
}
