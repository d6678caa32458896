diesel::table! {
    counters (name) {
        #[max_length = 255]
        name -> Varchar,
        seq -> Int8,
    }
}

diesel::table! {
    recipes (id) {
        id -> Int8,
        title -> Varchar,
        author -> Varchar,
        ingredients -> Array<Text>,
        steps -> Array<Text>,
        images -> Array<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(counters, recipes);
