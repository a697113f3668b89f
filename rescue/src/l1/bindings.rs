#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }
);

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface IENSRegistry {
        function owner(bytes32 node) external view returns (address);
        function setOwner(bytes32 node, address owner) external;
    }
);

sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface IWETH {
        function deposit() external payable;
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
);

// Helper contract: executes the checks after the preceding bundle legs
// and pays block.coinbase only when every check matches.
sol!(
    #[allow(missing_docs)]
    #[sol(rpc)]
    #[derive(Debug)]
    interface IMevBriber {
        function nonces(address owner) external view returns (uint256);

        function check32BytesAndSendMulti(
            address[] targets,
            bytes[] payloads,
            bytes32[] resultMatches
        ) external payable;

        function checkBytesAndSendMulti(
            address[] targets,
            bytes[] payloads,
            bytes[] resultMatches
        ) external payable;

        function check32BytesAndSendMultiWETH(
            address owner,
            address spender,
            uint256 value,
            uint256 deadline,
            uint8 v,
            bytes32 r,
            bytes32 s,
            address[] targets,
            bytes[] payloads,
            bytes32[] resultMatches
        ) external;

        function checkBytesAndSendMultiWETH(
            address owner,
            address spender,
            uint256 value,
            uint256 deadline,
            uint8 v,
            bytes32 r,
            bytes32 s,
            address[] targets,
            bytes[] payloads,
            bytes[] resultMatches
        ) external;
    }
);
