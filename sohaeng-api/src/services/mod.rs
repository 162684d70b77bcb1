pub mod profile_view;
