use model::{
    company::{Company, CompanyStatus},
    user::User,
    WithId,
};
use platform::database::Result;
use sqlx::{Executor, Postgres};
use utility::{
    id::{Id, IdWrapper},
    let_also::LetAlso,
};

use crate::data_model::{
    company::{CompanyRow, PgCompanyStatus},
    with_id, with_ids,
};

use super::convert_error;

pub async fn get<'c, E>(executor: E, id: &Id<Company>) -> Result<WithId<Company>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, owner_id, email, phone, address, city, description,
            license_number, status, rejection_reason, subscription_plan_id, created_at
        FROM companies
        WHERE id = $1;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map(|row: CompanyRow| with_id(row))
    .map_err(convert_error)
}

pub async fn insert<'c, E>(executor: E, company: WithId<Company>) -> Result<WithId<Company>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO companies(
            id,
            name,
            owner_id,
            email,
            phone,
            address,
            city,
            description,
            license_number,
            status,
            rejection_reason,
            subscription_plan_id,
            created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING id, name, owner_id, email, phone, address, city, description,
            license_number, status, rejection_reason, subscription_plan_id, created_at;
        ",
    )
    .bind(company.id.raw())
    .bind(&company.content.name)
    .bind(company.content.owner_id.raw())
    .bind(&company.content.email)
    .bind(&company.content.phone)
    .bind(&company.content.address)
    .bind(&company.content.city)
    .bind(&company.content.description)
    .bind(&company.content.license_number)
    .bind(PgCompanyStatus::from(company.content.status))
    .bind(&company.content.rejection_reason)
    .bind(company.content.subscription_plan_id.as_ref().raw())
    .bind(company.content.created_at)
    .fetch_one(executor)
    .await
    .map(|row: CompanyRow| with_id(row))
    .map_err(convert_error)
}

pub async fn update<'c, E>(executor: E, company: WithId<Company>) -> Result<WithId<Company>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE companies
        SET name = $1,
            email = $2,
            phone = $3,
            address = $4,
            city = $5,
            description = $6,
            license_number = $7,
            status = $8,
            rejection_reason = $9,
            subscription_plan_id = $10
        WHERE id = $11
        RETURNING id, name, owner_id, email, phone, address, city, description,
            license_number, status, rejection_reason, subscription_plan_id, created_at;
        ",
    )
    .bind(&company.content.name)
    .bind(&company.content.email)
    .bind(&company.content.phone)
    .bind(&company.content.address)
    .bind(&company.content.city)
    .bind(&company.content.description)
    .bind(&company.content.license_number)
    .bind(PgCompanyStatus::from(company.content.status))
    .bind(&company.content.rejection_reason)
    .bind(company.content.subscription_plan_id.as_ref().raw())
    .bind(company.id.raw())
    .fetch_one(executor)
    .await
    .map(|row: CompanyRow| with_id(row))
    .map_err(convert_error)
}

pub async fn get_by_owner<'c, E>(executor: E, owner: &Id<User>) -> Result<Option<WithId<Company>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, owner_id, email, phone, address, city, description,
            license_number, status, rejection_reason, subscription_plan_id, created_at
        FROM companies
        WHERE owner_id = $1;
        ",
    )
    .bind(owner.raw())
    .fetch_optional(executor)
    .await
    .map(|row: Option<CompanyRow>| row.map(with_id))
    .map_err(convert_error)
}

pub async fn get_all<'c, E>(
    executor: E,
    status: Option<CompanyStatus>,
) -> Result<Vec<WithId<Company>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, owner_id, email, phone, address, city, description,
            license_number, status, rejection_reason, subscription_plan_id, created_at
        FROM companies
        WHERE $1::company_status IS NULL OR status = $1
        ORDER BY created_at DESC;
        ",
    )
    .bind(status.map(PgCompanyStatus::from))
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|companies: Vec<CompanyRow>| Ok(with_ids(companies)))
}
