pub mod lnurl;
