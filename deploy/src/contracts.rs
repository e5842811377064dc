use ethers::contract::abigen;

abigen!(
    ProjectRegistry,
    r#"[
        function getProject(bytes32 repositoryIdentifier) external view returns (bytes cid, bool exists)
        function setProject(bytes32 repositoryIdentifier, bytes cid) external
    ]"#
);
