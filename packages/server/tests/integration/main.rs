mod documents;
mod graphql;
mod object_storage;
mod postgres;
