diesel::table! {
    payments (id) {
        id -> Varchar,
        reservation_id -> Uuid,
        payment_method -> Varchar,
        payment_code -> Varchar,
        grand_total -> Varchar,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    reservations (id) {
        id -> Uuid,
        user_id -> Uuid,
        venue_id -> Uuid,
        payment_id -> Nullable<Varchar>,
        check_in -> Timestamptz,
        check_out -> Timestamptz,
        duration -> Int4,
        subtotal -> Numeric,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    reviews (id) {
        id -> Uuid,
        user_id -> Uuid,
        venue_id -> Uuid,
        rating -> Int4,
        comment -> Text,
        created_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        password_hash -> Varchar,
        phone -> Nullable<Varchar>,
        role -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    venue_pictures (id) {
        id -> Uuid,
        venue_id -> Uuid,
        url -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    venues (id) {
        id -> Uuid,
        owner_id -> Uuid,
        category -> Varchar,
        name -> Varchar,
        description -> Text,
        price -> Numeric,
        location -> Varchar,
        latitude -> Float8,
        longitude -> Float8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(payments -> reservations (reservation_id));
diesel::joinable!(reservations -> users (user_id));
diesel::joinable!(reservations -> venues (venue_id));
diesel::joinable!(reviews -> users (user_id));
diesel::joinable!(reviews -> venues (venue_id));
diesel::joinable!(venue_pictures -> venues (venue_id));
diesel::joinable!(venues -> users (owner_id));

diesel::allow_tables_to_appear_in_same_query!(
    payments,
    reservations,
    reviews,
    users,
    venue_pictures,
    venues,
);
