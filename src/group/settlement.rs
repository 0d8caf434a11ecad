//! Works out who owes whom in a group, and the fewest transfers that settle it.

use std::{cmp::Ordering, collections::HashMap};

use serde::Serialize;

use crate::{
    auth::UserID,
    group::{GroupExpense, GroupMember},
};

/// Balances within this distance of zero are treated as settled.
const EPSILON: f64 = 0.01;

/// What a member paid compared to what they owe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberBalance {
    pub user_id: UserID,
    pub username: String,
    pub paid: f64,
    pub share: f64,
    /// `paid - share`. Positive means the member is owed money, negative means they owe money.
    pub balance: f64,
}

/// A payment from one member to another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settlement {
    pub from: UserID,
    pub to: UserID,
    pub amount: f64,
}

/// Compute every member's balance from the group's expenses.
///
/// Each expense is shared equally by its participants: the members listed in its
/// split data that are still in the group, or every member when that list is empty.
/// Expenses without any participants are ignored.
pub fn compute_balances(members: &[GroupMember], expenses: &[GroupExpense]) -> Vec<MemberBalance> {
    let mut paid: HashMap<UserID, f64> = HashMap::new();
    let mut share: HashMap<UserID, f64> = HashMap::new();
    let is_member = |user_id: &UserID| members.iter().any(|member| member.user_id == *user_id);

    for expense in expenses {
        let mut participants = expense
            .split_data
            .iter()
            .copied()
            .filter(|user_id| is_member(user_id))
            .collect::<Vec<_>>();

        if participants.is_empty() {
            participants = members.iter().map(|member| member.user_id).collect();
        }

        if participants.is_empty() {
            continue;
        }

        let share_per_participant = expense.amount / participants.len() as f64;
        for participant in participants {
            *share.entry(participant).or_default() += share_per_participant;
        }

        *paid.entry(expense.payer_id).or_default() += expense.amount;
    }

    members
        .iter()
        .map(|member| {
            let paid = paid.get(&member.user_id).copied().unwrap_or_default();
            let share = share.get(&member.user_id).copied().unwrap_or_default();

            MemberBalance {
                user_id: member.user_id,
                username: member.username.clone(),
                paid,
                share,
                balance: paid - share,
            }
        })
        .collect()
}

/// Suggest the transfers that bring every balance to zero.
///
/// The member who owes the most pays the member who is owed the most, repeatedly,
/// until one side runs out. Members with equal balances are taken in order of user ID.
pub fn settle(balances: &[MemberBalance]) -> Vec<Settlement> {
    settle_balances(
        balances
            .iter()
            .map(|member| (member.user_id, member.balance))
            .collect(),
    )
}

/// Settle a group where everyone owes the same `fair_share`.
pub fn settle_with_fair_share(members_paid: &[(UserID, f64)], fair_share: f64) -> Vec<Settlement> {
    settle_balances(
        members_paid
            .iter()
            .map(|(user_id, paid)| (*user_id, paid - fair_share))
            .collect(),
    )
}

fn settle_balances(balances: Vec<(UserID, f64)>) -> Vec<Settlement> {
    let by_balance_then_id = |a: &(UserID, f64), b: &(UserID, f64)| -> Ordering {
        a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
    };

    let mut debtors = balances
        .iter()
        .copied()
        .filter(|(_, balance)| *balance < -EPSILON)
        .collect::<Vec<_>>();
    debtors.sort_by(by_balance_then_id);

    let mut creditors = balances
        .iter()
        .copied()
        .filter(|(_, balance)| *balance > EPSILON)
        .collect::<Vec<_>>();
    creditors.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut settlements = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < debtors.len() && j < creditors.len() {
        let (debtor, owes) = debtors[i];
        let (creditor, owed) = creditors[j];
        let amount = owes.abs().min(owed);

        settlements.push(Settlement {
            from: debtor,
            to: creditor,
            amount: round_to_cents(amount),
        });

        debtors[i].1 += amount;
        creditors[j].1 -= amount;

        if debtors[i].1.abs() < EPSILON {
            i += 1;
        }

        if creditors[j].1 < EPSILON {
            j += 1;
        }
    }

    settlements
}

fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use time::{OffsetDateTime, macros::date};

    use crate::{
        auth::UserID,
        group::{GroupExpense, GroupMember},
    };

    use super::{Settlement, compute_balances, settle, settle_with_fair_share};

    fn user(id: i64) -> UserID {
        UserID::new(id)
    }

    fn member(id: i64, name: &str) -> GroupMember {
        GroupMember {
            id,
            group_id: 1,
            user_id: user(id),
            username: name.to_owned(),
            joined_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn expense(payer: i64, amount: f64, split_data: &[i64]) -> GroupExpense {
        GroupExpense {
            id: 0,
            group_id: 1,
            payer_id: user(payer),
            amount,
            description: "Test".to_owned(),
            date: date!(2025 - 01 - 01),
            split_data: split_data.iter().copied().map(user).collect(),
        }
    }

    #[test]
    fn one_debtor_pays_one_creditor() {
        let got = settle_with_fair_share(&[(user(1), 300.0), (user(2), 100.0), (user(3), 200.0)], 200.0);

        assert_eq!(
            got,
            vec![Settlement {
                from: user(2),
                to: user(1),
                amount: 100.0
            }]
        );
    }

    #[test]
    fn two_debtors_pay_the_same_creditor_in_id_order() {
        let got = settle_with_fair_share(&[(user(1), 0.0), (user(2), 0.0), (user(3), 300.0)], 100.0);

        assert_eq!(
            got,
            vec![
                Settlement {
                    from: user(1),
                    to: user(3),
                    amount: 100.0
                },
                Settlement {
                    from: user(2),
                    to: user(3),
                    amount: 100.0
                },
            ]
        );
    }

    #[test]
    fn equal_payments_need_no_settlement() {
        assert!(settle_with_fair_share(&[(user(1), 50.0), (user(2), 50.0)], 50.0).is_empty());
        assert!(settle_with_fair_share(&[], 0.0).is_empty());
    }

    #[test]
    fn debtors_pay_exactly_what_they_owe() {
        let cases: [&[(i64, f64)]; 4] = [
            &[(1, 10.0), (2, 0.0), (3, 0.0), (4, 50.0)],
            &[(1, 33.33), (2, 0.0), (3, 66.67)],
            &[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0), (5, 5.0), (6, 6.0), (7, 70.0)],
            &[(1, 19.99), (2, 0.01), (3, 100.0), (4, 0.0), (5, 12.5)],
        ];

        for case in cases {
            let members_paid = case.iter().map(|(id, paid)| (user(*id), *paid)).collect::<Vec<_>>();
            let fair_share = case.iter().map(|(_, paid)| paid).sum::<f64>() / case.len() as f64;

            let settlements = settle_with_fair_share(&members_paid, fair_share);

            let mut paid_away: HashMap<UserID, f64> = HashMap::new();
            for settlement in &settlements {
                *paid_away.entry(settlement.from).or_default() += settlement.amount;
            }

            for (user_id, paid) in &members_paid {
                let balance = paid - fair_share;
                if balance < -0.01 {
                    let sent = paid_away.get(user_id).copied().unwrap_or_default();
                    assert!(
                        (sent - balance.abs()).abs() <= 0.01 * members_paid.len() as f64,
                        "user {user_id} owes {balance} but sent {sent} in case {case:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn balances_sum_to_zero() {
        let members = [member(1, "alice"), member(2, "bob"), member(3, "carol")];
        let expenses = [expense(1, 90.0, &[]), expense(2, 10.0, &[2, 3])];

        let balances = compute_balances(&members, &expenses);

        let total = balances.iter().map(|balance| balance.balance).sum::<f64>();
        assert!(total.abs() < 0.01);
        assert_eq!(balances[0].paid, 90.0);
        assert_eq!(balances[0].share, 30.0);
        assert_eq!(balances[1].share, 35.0);
        assert_eq!(balances[2].balance, -35.0);
    }

    #[test]
    fn split_data_ignores_former_members() {
        let members = [member(1, "alice"), member(2, "bob")];
        let expenses = [expense(1, 40.0, &[2, 9])];

        let balances = compute_balances(&members, &expenses);

        assert_eq!(balances[0].balance, 40.0);
        assert_eq!(balances[1].balance, -40.0);
    }

    #[test]
    fn settle_uses_computed_balances() {
        let members = [member(1, "alice"), member(2, "bob")];
        let expenses = [expense(1, 30.0, &[]), expense(2, 10.0, &[])];

        let settlements = settle(&compute_balances(&members, &expenses));

        assert_eq!(
            settlements,
            vec![Settlement {
                from: user(2),
                to: user(1),
                amount: 10.0
            }]
        );
    }

    #[test]
    fn no_members_means_no_balances() {
        assert!(compute_balances(&[], &[expense(1, 10.0, &[])]).is_empty());
    }
}
