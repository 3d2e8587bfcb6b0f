pub mod attachment;
pub mod linked_attachment;
