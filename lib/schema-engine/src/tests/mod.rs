mod delegation;
mod public_schema;
mod stitching;
