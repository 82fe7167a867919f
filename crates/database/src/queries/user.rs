use model::{
    company::Company,
    user::{Role, User},
    WithId,
};
use platform::database::Result;
use sqlx::{Executor, Postgres};
use utility::{
    id::{Id, IdWrapper},
    let_also::LetAlso,
};

use crate::data_model::{
    user::{PgAccountStatus, PgRole, UserRow},
    with_id, with_ids,
};

use super::convert_error;

// Repo

pub async fn get<'c, E>(executor: E, id: &Id<User>) -> Result<WithId<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, email, full_name, phone, role, company_id, status, created_at
        FROM users
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map(|row: UserRow| with_id(row))
    .map_err(convert_error)
}

pub async fn insert<'c, E>(executor: E, user: WithId<User>) -> Result<WithId<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO users(
            id,
            email,
            full_name,
            phone,
            role,
            company_id,
            status,
            created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, email, full_name, phone, role, company_id, status, created_at;
        ",
    )
    .bind(user.id.raw())
    .bind(&user.content.email)
    .bind(&user.content.full_name)
    .bind(&user.content.phone)
    .bind(PgRole::from(user.content.role))
    .bind(user.content.company_id.as_ref().raw())
    .bind(PgAccountStatus::from(user.content.status))
    .bind(user.content.created_at)
    .fetch_one(executor)
    .await
    .map(|row: UserRow| with_id(row))
    .map_err(convert_error)
}

pub async fn update<'c, E>(executor: E, user: WithId<User>) -> Result<WithId<User>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE users
        SET email = $1,
            full_name = $2,
            phone = $3,
            role = $4,
            company_id = $5,
            status = $6
        WHERE id = $7
        RETURNING id, email, full_name, phone, role, company_id, status, created_at;
        ",
    )
    .bind(&user.content.email)
    .bind(&user.content.full_name)
    .bind(&user.content.phone)
    .bind(PgRole::from(user.content.role))
    .bind(user.content.company_id.as_ref().raw())
    .bind(PgAccountStatus::from(user.content.status))
    .bind(user.id.raw())
    .fetch_one(executor)
    .await
    .map(|row: UserRow| with_id(row))
    .map_err(convert_error)
}

// User Repo

pub async fn get_by_email<'c, E>(executor: E, email: &str) -> Result<Option<WithId<User>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, email, full_name, phone, role, company_id, status, created_at
        FROM users
        WHERE email = $1;
        ",
    )
    .bind(email)
    .fetch_optional(executor)
    .await
    .map(|row: Option<UserRow>| row.map(with_id))
    .map_err(convert_error)
}

pub async fn get_password_hash<'c, E>(executor: E, id: &Id<User>) -> Result<Option<String>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1;")
        .bind(id.raw())
        .fetch_optional(executor)
        .await
        .map(|hash: Option<Option<String>>| hash.flatten())
        .map_err(convert_error)
}

pub async fn set_password_hash<'c, E>(executor: E, id: &Id<User>, hash: &str) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2;")
        .bind(hash)
        .bind(id.raw())
        .execute(executor)
        .await
        .map_err(convert_error)?;
    if result.rows_affected() == 0 {
        return Err(convert_error(sqlx::Error::RowNotFound));
    }
    Ok(())
}

pub async fn get_by_company<'c, E>(executor: E, company: &Id<Company>) -> Result<Vec<WithId<User>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, email, full_name, phone, role, company_id, status, created_at
        FROM users
        WHERE company_id = $1
        ORDER BY created_at;
        ",
    )
    .bind(company.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|users: Vec<UserRow>| Ok(with_ids(users)))
}

pub async fn get_all<'c, E>(executor: E, role: Option<Role>) -> Result<Vec<WithId<User>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, email, full_name, phone, role, company_id, status, created_at
        FROM users
        WHERE $1::user_role IS NULL OR role = $1
        ORDER BY created_at;
        ",
    )
    .bind(role.map(PgRole::from))
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|users: Vec<UserRow>| Ok(with_ids(users)))
}
