pub mod msisdn;
