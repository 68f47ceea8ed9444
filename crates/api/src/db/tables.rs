//! Column identifiers for all tables, checked at compile time.

use sea_query::Iden;

#[derive(Iden)]
pub enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    PasswordSalt,
    IsAdmin,
    CreatedAt,
}

#[derive(Iden)]
pub enum Parties {
    Table,
    Id,
    Title,
    Platform,
    Description,
    ScheduledAt,
    CreatorId,
    ReminderSentFor,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum Invitations {
    Table,
    Id,
    PartyId,
    UserId,
    Status,
    Origin,
    CreatedAt,
    RespondedAt,
}
