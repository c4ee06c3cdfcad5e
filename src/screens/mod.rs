pub mod landing;
pub mod submissions;
