use sea_orm_migration::prelude::*;

// Define table names
#[derive(DeriveIden)]
pub enum Division {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
pub enum Church {
    Table,
    Id,
    Name,
    DivisionId,
}

#[derive(DeriveIden)]
pub enum Coordinator {
    Table,
    Id,
    Name,
    DivisionId,
}

#[derive(DeriveIden)]
pub enum Pastor {
    Table,
    Id,
    Name,
    Phone,
    Email,
    ChurchId,
}

#[derive(DeriveIden)]
pub enum User {
    Table,
    Id,
    Name,
    Email,
    Role,
    ChurchId,
    AuthHash,
}

#[derive(DeriveIden)]
pub enum Event {
    Table,
    Id,
    Name,
    Description,
    Location,
    BannerUrl,
    BannerPath,
    StartDate,
    EndDate,
    PreRegistrationStart,
    PreRegistrationEnd,
    PreRegistrationFee,
    PreRegistrationSiblingDiscount,
    OnsiteRegistrationFee,
    OnsiteSiblingDiscount,
    CookRegistrationFee,
    Status,
}

#[derive(DeriveIden)]
pub enum Registration {
    Table,
    Id,
    EventId,
    ChurchId,
    PresidentId,
    Status,
}

#[derive(DeriveIden)]
pub enum Batch {
    Table,
    Id,
    RegistrationId,
    BatchNumber,
    Status,
    IsPreRegistration,
    ReceiptUrl,
    ReceiptPath,
    ReviewedAt,
    ReviewedBy,
    RejectionRemarks,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Attendee {
    Table,
    Id,
    BatchId,
    FullName,
    Nickname,
    Age,
    Gender,
    PersonType,
}
