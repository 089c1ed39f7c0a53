pub mod error;
pub mod heap;
pub mod object;
pub mod object_property;
pub mod realm;
pub mod value;

pub mod operations {
    pub mod test_and_comparison;
    pub mod type_conversion;
}
