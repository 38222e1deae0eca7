use crate::{
    error::{ArsenalDbError, ArsenalDbResult as Result},
    now,
    profiles::ProfileId,
    schema::credit_transactions,
};
use chrono::NaiveDateTime;
use diesel::{prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pseudo struct managing profile balances together with the `credit_transactions` ledger.
///
/// Every balance change happens in one transaction with its ledger row, so the sum of a profile's
/// ledger always equals its balance.
pub struct CreditTransactions;

impl CreditTransactions {
    fn record(
        conn: &mut SqliteConnection,
        profile: &ProfileId,
        amount: i64,
        why: &str,
    ) -> Result<()> {
        let row = CreditTransaction {
            id: Uuid::new_v4().to_string(),
            profile_id: profile.get_id().to_string(),
            delta: amount,
            reason: why.trim().to_string(),
            created_at: now(),
        };
        diesel::insert_into(credit_transactions::table)
            .values(&row)
            .execute(conn)?;
        Ok(())
    }

    fn balance(conn: &mut SqliteConnection, profile: &ProfileId) -> Result<i64> {
        use crate::schema::profiles::dsl::*;
        Ok(profiles
            .filter(id.eq(profile.get_id()))
            .select(credits)
            .first::<i64>(conn)?)
    }

    /// Add `amount` credits, returning the new balance.
    pub fn grant(
        conn: &mut SqliteConnection,
        profile: &ProfileId,
        amount: i64,
        reason: &str,
    ) -> Result<i64> {
        if amount <= 0 {
            return Err(ArsenalDbError::InvalidCreditAmount);
        }
        conn.transaction::<_, ArsenalDbError, _>(|conn| {
            use crate::schema::profiles::dsl::*;
            diesel::update(profiles.filter(id.eq(profile.get_id())))
                .set(credits.eq(credits + amount))
                .execute(conn)?;
            Self::record(conn, profile, amount, reason)?;
            Self::balance(conn, profile)
        })
    }

    /// Take `amount` credits, returning the new balance. Nothing is written if the balance is short.
    ///
    /// May be called inside an outer transaction; it then runs as a savepoint.
    pub fn consume(
        conn: &mut SqliteConnection,
        profile: &ProfileId,
        amount: i64,
        reason: &str,
    ) -> Result<i64> {
        if amount <= 0 {
            return Err(ArsenalDbError::InvalidCreditAmount);
        }
        conn.transaction::<_, ArsenalDbError, _>(|conn| {
            use crate::schema::profiles::dsl::*;
            let available = Self::balance(conn, profile)?;
            if available < amount {
                return Err(ArsenalDbError::InsufficientCredits {
                    required: amount,
                    available,
                });
            }
            diesel::update(profiles.filter(id.eq(profile.get_id())))
                .set(credits.eq(credits - amount))
                .execute(conn)?;
            Self::record(conn, profile, -amount, reason)?;
            Self::balance(conn, profile)
        })
    }

    pub fn delete_by_profile(conn: &mut SqliteConnection, profile: &ProfileId) -> Result<usize> {
        use crate::schema::credit_transactions::dsl::*;
        Ok(diesel::delete(credit_transactions.filter(profile_id.eq(profile.get_id())))
            .execute(conn)?)
    }
}

/// A single ledger row, corresponding to a row in the table `credit_transactions`
#[derive(Debug, Serialize, Deserialize, Queryable, Identifiable, Insertable, Clone)]
#[diesel(table_name = credit_transactions)]
pub struct CreditTransaction {
    id: String,
    profile_id: String,
    delta: i64,
    reason: String,
    created_at: NaiveDateTime,
}

impl CreditTransaction {
    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn get_delta(&self) -> i64 {
        self.delta
    }

    pub fn get_reason(&self) -> &str {
        &self.reason
    }

    pub fn get_created_at(&self) -> &NaiveDateTime {
        &self.created_at
    }
}

type BoxedQuery<'a> = credit_transactions::BoxedQuery<'a, Sqlite>;

/// A search query helper (builder)
pub struct CreditTransactionFinder<'a> {
    conn: &'a mut SqliteConnection,
    query: BoxedQuery<'a>,
}

impl<'a> CreditTransactionFinder<'a> {
    pub fn new(conn: &'a mut SqliteConnection, query: Option<BoxedQuery<'a>>) -> Self {
        use crate::schema::credit_transactions::dsl::*;
        if let Some(q) = query {
            Self { conn, query: q }
        } else {
            Self {
                conn,
                query: credit_transactions.into_boxed(),
            }
        }
    }

    // Latest first
    pub fn search(self) -> Result<Vec<CreditTransaction>> {
        use crate::schema::credit_transactions::dsl::*;
        Ok(self
            .query
            .order(created_at.desc())
            .load::<CreditTransaction>(self.conn)?)
    }

    pub fn count(self) -> Result<i64> {
        Ok(self.query.count().get_result(self.conn)?)
    }

    pub fn profile(mut self, profile: &'a str) -> Self {
        use crate::schema::credit_transactions::dsl::*;
        self.query = self.query.filter(profile_id.eq(profile));
        self
    }
}
