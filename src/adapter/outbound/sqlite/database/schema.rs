// Diesel table definitions matching migrations/.

diesel::table! {
    tokens (id) {
        id -> Integer,
        value -> Text,
        role -> Text,
        subscription_until -> Nullable<Text>,
        is_active -> Bool,
        created_at -> Text,
    }
}

diesel::table! {
    users (id) {
        id -> Integer,
        telegram_id -> BigInt,
        token_id -> Nullable<Integer>,
        subscription_until -> Nullable<Text>,
        store_link -> Nullable<Text>,
        notify_orders -> Bool,
        notify_sales -> Bool,
        notify_daily_report -> Bool,
        notify_incomes -> Bool,
        notify_cancel -> Bool,
        created_at -> Text,
    }
}

diesel::table! {
    user_warehouses (user_id, warehouse_id) {
        user_id -> Integer,
        warehouse_id -> BigInt,
    }
}

diesel::table! {
    user_box_types (user_id, box_type) {
        user_id -> Integer,
        box_type -> Text,
    }
}

diesel::table! {
    orders (token_id, srid) {
        token_id -> Integer,
        srid -> Text,
        last_change_date -> Text,
        date -> Nullable<Text>,
        warehouse_name -> Nullable<Text>,
        region_name -> Nullable<Text>,
        subject -> Nullable<Text>,
        supplier_article -> Nullable<Text>,
        tech_size -> Nullable<Text>,
        nm_id -> Nullable<BigInt>,
        brand -> Nullable<Text>,
        price_with_disc -> Double,
        total_price -> Double,
        spp -> Double,
        is_cancel -> Bool,
    }
}

diesel::table! {
    sales (token_id, sale_id) {
        token_id -> Integer,
        sale_id -> Text,
        last_change_date -> Text,
        date -> Nullable<Text>,
        warehouse_name -> Nullable<Text>,
        region_name -> Nullable<Text>,
        subject -> Nullable<Text>,
        supplier_article -> Nullable<Text>,
        tech_size -> Nullable<Text>,
        nm_id -> Nullable<BigInt>,
        brand -> Nullable<Text>,
        price_with_disc -> Double,
        total_price -> Double,
        spp -> Double,
    }
}

diesel::table! {
    stocks (token_id, nm_id, warehouse_name) {
        token_id -> Integer,
        nm_id -> BigInt,
        warehouse_name -> Text,
        last_change_date -> Text,
        quantity -> Integer,
        quantity_full -> Nullable<Integer>,
        in_way_to_client -> Nullable<Integer>,
        subject -> Nullable<Text>,
    }
}

diesel::table! {
    incomes (token_id, income_id, nm_id) {
        token_id -> Integer,
        income_id -> BigInt,
        nm_id -> BigInt,
        number -> Nullable<Text>,
        date -> Nullable<Text>,
        last_change_date -> Text,
        supplier_article -> Nullable<Text>,
        tech_size -> Nullable<Text>,
        barcode -> Nullable<Text>,
        quantity -> Integer,
        total_price -> Double,
        date_close -> Nullable<Text>,
        warehouse_name -> Nullable<Text>,
        status -> Nullable<Text>,
    }
}

diesel::table! {
    acceptance_coefficients (token_id, warehouse_id, box_type_id, date) {
        token_id -> Integer,
        warehouse_id -> BigInt,
        warehouse_name -> Nullable<Text>,
        box_type_id -> BigInt,
        box_type_name -> Nullable<Text>,
        date -> Text,
        coefficient -> Double,
        allow_unload -> Bool,
        storage_coef -> Nullable<Double>,
        delivery_coef -> Nullable<Double>,
        is_sorting_center -> Bool,
        observed_at -> Text,
    }
}

diesel::table! {
    report_details (token_id, rrd_id) {
        token_id -> Integer,
        rrd_id -> BigInt,
        create_dt -> Nullable<Text>,
        order_dt -> Nullable<Text>,
        subject_name -> Text,
        nm_id -> BigInt,
        brand_name -> Nullable<Text>,
        quantity -> Integer,
        retail_price -> Double,
        retail_amount -> Double,
        office_name -> Nullable<Text>,
        delivery_amount -> Integer,
        return_amount -> Integer,
        delivery_rub -> Double,
        commission_percent -> Double,
    }
}

diesel::table! {
    products (nm_id) {
        nm_id -> BigInt,
        owner_token_id -> Integer,
        subject_name -> Nullable<Text>,
        brand_name -> Nullable<Text>,
        supplier_article -> Nullable<Text>,
        tech_size -> Nullable<Text>,
        image_url -> Nullable<Text>,
        rating -> Nullable<Double>,
        reviews -> Nullable<Integer>,
        thumbnail -> Nullable<Binary>,
        last_update -> Text,
    }
}

diesel::table! {
    payments (id) {
        id -> Integer,
        user_id -> Integer,
        token_id -> Integer,
        tariff -> Text,
        amount -> Double,
        currency -> Text,
        provider_payment_id -> Nullable<Text>,
        status -> Text,
        created_at -> Text,
    }
}

diesel::joinable!(users -> tokens (token_id));
diesel::joinable!(user_warehouses -> users (user_id));
diesel::joinable!(user_box_types -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    tokens,
    users,
    user_warehouses,
    user_box_types,
    orders,
    sales,
    stocks,
    incomes,
    acceptance_coefficients,
    report_details,
    products,
    payments,
);
