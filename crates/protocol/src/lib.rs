mod endpoint;
mod literal;
mod request;
mod response;

pub use endpoint::{next_build_num_url, NEXT_BUILD_NUM_PATH};
pub use literal::{parse_literal, DecodeError, Literal, MAX_NESTING};
pub use request::BuildNumRequest;
pub use response::{is_truthy, BuildNumResponse, BuildNumber, ResponseError};
