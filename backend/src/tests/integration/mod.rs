mod api_entity_types;
mod api_records;
mod api_routes;
