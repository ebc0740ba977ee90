// Esquema Diesel para SQLite.
// Tablas: citas, cita_historial, pacientes
use diesel::allow_tables_to_appear_in_same_query;
diesel::table! {
    citas (id) {
        id -> Text,
        kind -> Text,
        patient_id -> Text,
        resource_id -> Nullable<Text>,
        service -> Text,
        date -> Text,
        time -> Text,
        status -> Text,
        estimated_duration -> Nullable<Integer>,
        price -> Nullable<Text>,
        notes -> Nullable<Text>,
        cut_style -> Nullable<Text>,
        cancellation_reason -> Nullable<Text>,
        final_observations -> Nullable<Text>,
        confirmed_at -> Nullable<Text>,
        reminder_sent_at -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}
diesel::table! {
    cita_historial (id) {
        id -> Text,
        cita_id -> Text,
        seq -> BigInt,
        action -> Text,
        from_status -> Nullable<Text>,
        to_status -> Text,
        actor -> Text,
        detail -> Nullable<Text>,
        at -> Text,
    }
}
diesel::table! {
    pacientes (patient_id) {
        patient_id -> Text,
        pet_name -> Text,
        owner_name -> Text,
        owner_email -> Nullable<Text>,
        species -> Nullable<Text>,
    }
}
allow_tables_to_appear_in_same_query!(citas, cita_historial, pacientes);
